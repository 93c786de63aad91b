use std::path::Path;

use pilet_debug::DebugConfig;
use pilet_feed::FeedConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How an [`Instance`](crate::Instance) finds its pilets.
///
/// ```json
/// {
///   "feed": { "url": "https://feed.example.com/api/v1/pilet" },
///   "debug": { "origin": "http://localhost:1234" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Feed service to request pilets from. Without one, no pilets are
    /// requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed: Option<FeedConfig>,

    /// Enables the debug emulator and live reload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugConfig>,
}

impl InstanceConfig {
    /// Load a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
