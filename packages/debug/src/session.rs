//! Session-scoped debug settings.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

/// Load pilets from the feed in addition to the debug pilets.
pub const LOAD_PILETS: &str = "dbg:load-pilets";

/// Restart the whole session on a live-reload message instead of swapping
/// the changed pilet.
pub const HARD_REFRESH: &str = "dbg:hard-refresh";

/// Optional address of the pilet API proxy.
pub const PILET_API: &str = "dbg:pilet-api";

const ON: &str = "on";

/// Key/value settings that live as long as a debug session.
///
/// Created at session start and read by the emulator and the live-reload
/// channel. Only debug tooling is expected to call the setters.
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    values: RwLock<HashMap<String, String>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// A flag is set only when its value is exactly `on`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).as_deref() == Some(ON)
    }

    pub fn set_flag(&self, key: impl Into<String>, on: bool) {
        self.set(key, if on { ON } else { "off" });
    }

    pub fn load_pilets(&self) -> bool {
        self.flag(LOAD_PILETS)
    }

    pub fn hard_refresh(&self) -> bool {
        self.flag(HARD_REFRESH)
    }

    pub fn pilet_api(&self) -> Option<String> {
        self.get(PILET_API).filter(|api| !api.is_empty())
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
