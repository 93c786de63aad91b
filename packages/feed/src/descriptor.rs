//! Pilet metadata as served by a feed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FeedError, Result};

/// Metadata describing one pilet.
///
/// Descriptors are immutable once fetched and are identified by `name`
/// within a session. Fields the host does not understand are kept in
/// `extra` and survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiletDescriptor {
    pub name: String,

    #[serde(default)]
    pub version: String,

    /// Where the pilet's code can be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Inline code, used instead of `link` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Schema version of the pilet format (`v0`, `v1`, `v2`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Shared dependencies the pilet expects, by name to URL.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    /// Pilet configuration supplied by the feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where a pilet's code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiletSource<'a> {
    Inline(&'a str),
    Link(&'a str),
    /// Neither code nor link; only a statically known module can satisfy it.
    Unspecified,
}

impl PiletDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            link: None,
            content: None,
            spec: None,
            hash: None,
            dependencies: BTreeMap::new(),
            config: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    /// Inline content wins over a link.
    pub fn source(&self) -> PiletSource<'_> {
        match (&self.content, &self.link) {
            (Some(content), _) => PiletSource::Inline(content),
            (None, Some(link)) => PiletSource::Link(link),
            (None, None) => PiletSource::Unspecified,
        }
    }
}

/// Normalize a feed body into a list of descriptors.
///
/// A feed may answer with a single descriptor, an array of descriptors, or
/// an `{ "items": [...] }` envelope. `null` is an empty feed.
pub fn parse_feed(body: Value) -> Result<Vec<PiletDescriptor>> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => Ok(serde_json::from_value(body)?),
        Value::Object(mut map) => {
            if !map.contains_key("name") && matches!(map.get("items"), Some(Value::Array(_))) {
                let items = map.remove("items").unwrap_or(Value::Null);
                return Ok(serde_json::from_value(items)?);
            }
            Ok(vec![serde_json::from_value(Value::Object(map))?])
        }
        Value::Bool(_) => Err(FeedError::InvalidFeed { found: "a bool" }),
        Value::Number(_) => Err(FeedError::InvalidFeed { found: "a number" }),
        Value::String(_) => Err(FeedError::InvalidFeed { found: "a string" }),
    }
}
