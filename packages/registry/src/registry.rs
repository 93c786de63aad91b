//! A keyed registry of provider registrations.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::name::namespace_of;

/// Registry of capability providers, keyed by namespaced name.
///
/// The registry only manages membership. Invoking a provider is the
/// caller's job, using the snapshot returned by [`ProviderRegistry::list`]
/// or [`ProviderRegistry::entries`].
///
/// Keys are unique at any instant. Registering under an existing key
/// replaces the previous registration and moves it to the end of the
/// registration order.
pub struct ProviderRegistry<T> {
    entries: RwLock<IndexMap<String, Arc<T>>>,
}

impl<T> ProviderRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a provider, returning the registration it replaced.
    pub fn register(&self, key: impl Into<String>, registration: T) -> Option<Arc<T>> {
        self.register_arc(key, Arc::new(registration))
    }

    pub fn register_arc(&self, key: impl Into<String>, registration: Arc<T>) -> Option<Arc<T>> {
        let key = key.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.shift_remove(&key);
        if previous.is_some() {
            tracing::debug!(key = %key, "replacing provider registration");
        }
        entries.insert(key, registration);
        previous
    }

    /// Remove a provider. Removing an unknown key is a no-op.
    pub fn unregister(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(key)
    }

    /// Remove every provider registered by a pilet, returning their keys.
    pub fn unregister_namespace(&self, pilet: &str) -> Vec<String> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = Vec::new();
        entries.retain(|key, _| {
            if namespace_of(key) == Some(pilet) {
                removed.push(key.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Snapshot of all registrations in registration order.
    pub fn list(&self) -> Vec<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Snapshot of all `(key, registration)` pairs in registration order.
    pub fn entries(&self) -> Vec<(String, Arc<T>)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ProviderRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ProviderRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
