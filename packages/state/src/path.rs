//! Selector paths into the global state tree.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A state key that cannot be addressed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid state key {key:?} at position {position}: {reason}")]
pub struct PathError {
    pub key: String,
    pub position: usize,
    pub reason: &'static str,
}

/// A selector into the global state, written `domain/key/...`.
///
/// The first key names a state domain (`registry`, `search`, ...). Later
/// keys walk object members, or array elements when they are numeric.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatePath {
    keys: Vec<String>,
}

impl StatePath {
    /// Selects the whole tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `a/b/c`. Leading, trailing and doubled slashes are ignored.
    ///
    /// ```rust
    /// use pilet_state::StatePath;
    ///
    /// let path = StatePath::parse("registry/extensions/pilet-search").unwrap();
    /// assert_eq!(path.keys(), ["registry", "extensions", "pilet-search"]);
    /// assert_eq!(StatePath::parse("/search/").unwrap(), StatePath::from(["search"]));
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        Self::from_keys(s.split('/').filter(|k| !k.is_empty()))
    }

    /// Build a path from individual keys, which may contain `/`-free text only.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        for (position, key) in keys.iter().enumerate() {
            check_key(key, position)?;
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// The state domain this path selects into.
    pub fn domain(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    /// This path extended by one key.
    pub fn child(&self, key: impl Into<String>) -> Result<Self, PathError> {
        let key = key.into();
        check_key(&key, self.keys.len())?;
        let mut keys = self.keys.clone();
        keys.push(key);
        Ok(Self { keys })
    }

    /// The parent path and the last key; `None` at the root.
    pub fn split_last(&self) -> Option<(StatePath, &str)> {
        let (last, parent) = self.keys.split_last()?;
        Some((
            StatePath {
                keys: parent.to_vec(),
            },
            last,
        ))
    }

    pub fn starts_with(&self, prefix: &StatePath) -> bool {
        self.keys.starts_with(&prefix.keys)
    }
}

fn check_key(key: &str, position: usize) -> Result<(), PathError> {
    let reason = if key.is_empty() {
        "empty key"
    } else if key.contains('/') {
        "keys cannot contain '/'"
    } else if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        "keys cannot contain whitespace or control characters"
    } else {
        return Ok(());
    };
    Err(PathError {
        key: key.to_string(),
        position,
        reason,
    })
}

/// Literal keys written in source are taken as they are.
impl<const N: usize> From<[&str; N]> for StatePath {
    fn from(keys: [&str; N]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl FromStr for StatePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join("/"))
    }
}

/// Parse a state path literal, panicking when it is malformed.
///
/// ```rust
/// use pilet_state::state_path;
///
/// assert_eq!(state_path!("search/results/items").len(), 3);
/// ```
#[macro_export]
macro_rules! state_path {
    ($s:expr) => {
        $crate::StatePath::parse($s).expect("invalid state path literal")
    };
}
