use serde::{Deserialize, Serialize};

/// Debug session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Pilet API path used when the session names no proxy.
    #[serde(default = "default_pilet_api_fallback")]
    pub pilet_api_fallback: String,

    /// Origin that relative pilet API addresses resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_pilet_api_fallback() -> String {
    "/$pilet-api".to_string()
}

fn default_origin() -> String {
    "http://localhost:1234".to_string()
}

impl DebugConfig {
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            pilet_api_fallback: default_pilet_api_fallback(),
            origin: default_origin(),
        }
    }
}
