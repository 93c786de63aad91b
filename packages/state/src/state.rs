//! The global state tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StateError;
use crate::path::StatePath;

/// The single state tree shared by the host and every pilet.
///
/// Top-level keys are state domains (`registry`, `modules`, `search`, or any
/// feature namespace). Values are plain JSON so that any pilet can read any
/// domain without compile-time coupling to the pilet that wrote it.
///
/// `GlobalState` is a value: update functions take one by value and return
/// the next one. The container never hands out a mutable reference to the
/// live tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalState {
    domains: Map<String, Value>,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, StateError> {
        match value {
            Value::Object(domains) => Ok(Self { domains }),
            Value::Null => Ok(Self::default()),
            other => Err(StateError::NotAnObject {
                found: kind_of(&other),
            }),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.domains.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.domains)
    }

    pub fn domain(&self, key: &str) -> Option<&Value> {
        self.domains.get(key)
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Look up the value at a path.
    ///
    /// Returns `None` when any component is missing, an array index is out of
    /// range, or the walk reaches a scalar before the path ends.
    pub fn get(&self, path: &StatePath) -> Option<&Value> {
        let (first, rest) = path.keys().split_first()?;
        let mut cursor = self.domains.get(first)?;
        for component in rest {
            cursor = match cursor {
                Value::Object(map) => map.get(component)?,
                Value::Array(items) => items.get(component.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(cursor)
    }

    /// Replace a whole domain.
    #[must_use]
    pub fn with_domain(mut self, key: impl Into<String>, value: Value) -> Self {
        self.domains.insert(key.into(), value);
        self
    }

    /// Write `value` at `path`.
    ///
    /// This is total: missing intermediate objects are created and scalar
    /// intermediates are replaced by objects. Numeric components index into
    /// arrays, padding with `null` when the index is past the end; an index
    /// more than 1024 past the end leaves the array unchanged. Writing
    /// at the root replaces the tree when `value` is an object and clears it
    /// otherwise.
    pub fn set(&mut self, path: &StatePath, value: Value) {
        let Some((first, rest)) = path.keys().split_first() else {
            self.domains = match value {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            return;
        };

        let slot = self.domains.entry(first.clone()).or_insert(Value::Null);
        set_in(slot, rest, value);
    }

    /// Remove the value at `path`, returning it.
    pub fn remove(&mut self, path: &StatePath) -> Option<Value> {
        let (parent, last) = path.split_last()?;
        if parent.is_root() {
            return self.domains.remove(last);
        }

        let (first, rest) = parent.keys().split_first()?;
        let mut cursor = self.domains.get_mut(first)?;
        for component in rest {
            cursor = match cursor {
                Value::Object(map) => map.get_mut(component)?,
                Value::Array(items) => items.get_mut(component.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match cursor {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let index = last.parse::<usize>().ok()?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }
}

/// How many `null`s a write past the end of an array may insert. Writes
/// further out leave the array unchanged.
const MAX_ARRAY_PADDING: usize = 1024;

fn set_in(slot: &mut Value, rest: &[String], value: Value) {
    let Some((head, tail)) = rest.split_first() else {
        *slot = value;
        return;
    };

    if let Value::Array(items) = slot {
        if let Ok(index) = head.parse::<usize>() {
            if index >= items.len() {
                let gap = index - items.len();
                if gap > MAX_ARRAY_PADDING {
                    tracing::debug!(index, len = items.len(), "ignoring write far past the end of an array");
                    return;
                }
                items.resize(index + 1, Value::Null);
            }
            set_in(&mut items[index], tail, value);
            return;
        }
    }

    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let next = map.entry(head.clone()).or_insert(Value::Null);
        set_in(next, tail, value);
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
