//! Update functions: the only way a new state is derived from the old one.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::path::StatePath;
use crate::state::GlobalState;

/// A pure, total transformation from one global state to the next.
///
/// Updates receive the previous state by value and must return the next one
/// without blocking or performing I/O. Several updates can be composed with
/// [`with_all`] and are then applied as a single transition.
pub struct Update(Box<dyn FnOnce(GlobalState) -> GlobalState + Send>);

impl Update {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(GlobalState) -> GlobalState + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// An update that returns the state unchanged.
    pub fn identity() -> Self {
        Self::new(|state| state)
    }

    pub fn apply(self, state: GlobalState) -> GlobalState {
        (self.0)(state)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Update(..)")
    }
}

impl<F> From<F> for Update
where
    F: FnOnce(GlobalState) -> GlobalState + Send + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// Compose updates into one, applied in the given order.
pub fn with_all(updates: impl IntoIterator<Item = Update>) -> Update {
    let updates: Vec<Update> = updates.into_iter().collect();
    Update::new(move |state| updates.into_iter().fold(state, |acc, u| u.apply(acc)))
}

/// Replace a whole state domain.
pub fn with_domain(key: impl Into<String>, value: Value) -> Update {
    let key = key.into();
    Update::new(move |state| state.with_domain(key, value))
}

/// Write a value at a path.
pub fn with_path(path: StatePath, value: Value) -> Update {
    Update::new(move |mut state| {
        state.set(&path, value);
        state
    })
}

/// Remove whatever is stored at a path.
pub fn without_path(path: StatePath) -> Update {
    Update::new(move |mut state| {
        state.remove(&path);
        state
    })
}

/// Transform the value at a path, treating a missing value as `null`.
pub fn map_path<F>(path: StatePath, f: F) -> Update
where
    F: FnOnce(Value) -> Value + Send + 'static,
{
    Update::new(move |mut state| {
        let current = state.get(&path).cloned().unwrap_or(Value::Null);
        state.set(&path, f(current));
        state
    })
}

/// Register a host component on the extension slot called `name`.
///
/// Root extensions are rendered by the host itself rather than by a pilet,
/// so the entry carries an empty pilet name. Entries accumulate per slot.
pub fn with_root_extension(name: impl Into<String>, component: Value) -> Update {
    let name = name.into();
    map_path(StatePath::from(["registry", "extensions"]), move |current| {
        let mut slots = match current {
            Value::Object(slots) => slots,
            _ => Map::new(),
        };
        let entry = json!({
            "name": name.as_str(),
            "pilet": "",
            "component": component,
            "defaults": {},
        });
        match slots.get_mut(&name) {
            Some(Value::Array(entries)) => entries.push(entry),
            _ => {
                slots.insert(name, Value::Array(vec![entry]));
            }
        }
        Value::Object(slots)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_path;
    use serde_json::json;

    #[test]
    fn identity_keeps_state() {
        let state = GlobalState::new().with_domain("a", json!(1));
        assert_eq!(Update::identity().apply(state.clone()), state);
    }

    #[test]
    fn with_all_applies_in_order() {
        let update = with_all([
            with_path(state_path!("counter"), json!(1)),
            map_path(state_path!("counter"), |v| json!(v.as_i64().unwrap_or(0) * 10)),
            map_path(state_path!("counter"), |v| json!(v.as_i64().unwrap_or(0) + 2)),
        ]);
        let state = update.apply(GlobalState::new());
        assert_eq!(state.domain("counter"), Some(&json!(12)));
    }

    #[test]
    fn with_all_of_nothing_is_identity() {
        let state = GlobalState::new().with_domain("x", json!("y"));
        assert_eq!(with_all(Vec::new()).apply(state.clone()), state);
    }

    #[test]
    fn without_path_removes() {
        let state = with_all([
            with_domain("search", json!({"input": "q", "results": []})),
            without_path(state_path!("search/results")),
        ])
        .apply(GlobalState::new());
        assert_eq!(state.domain("search"), Some(&json!({"input": "q"})));
    }

    #[test]
    fn root_extensions_accumulate_per_slot() {
        let state = with_all([
            with_root_extension("pilet-search", json!("Search")),
            with_root_extension("pilet-search-input", json!("SearchInput")),
            with_root_extension("pilet-search", json!("SearchFooter")),
        ])
        .apply(GlobalState::new());

        let search = state
            .get(&state_path!("registry/extensions/pilet-search"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(search.len(), 2);
        assert_eq!(search[0]["pilet"], json!(""));
        assert_eq!(search[1]["component"], json!("SearchFooter"));
        assert_eq!(
            state.get(&state_path!("registry/extensions/pilet-search-input/0/component")),
            Some(&json!("SearchInput"))
        );
    }

    #[test]
    fn closures_convert_into_updates() {
        let update: Update = (|state: GlobalState| state.with_domain("k", json!(true))).into();
        assert_eq!(update.apply(GlobalState::new()).domain("k"), Some(&json!(true)));
    }
}
