use std::fmt;
use std::sync::Arc;

use pilet_loader::Disposer;
use pilet_registry::{build_name, LocalName, NameAllocator};

use crate::engine::{SearchEngine, SearchOutcome};
use crate::handler::{SearchHandler, SearchProviderRegistration, SearchSettings};

/// Search capabilities of one pilet, retrieved with
/// `api.extension::<PiletSearchApi>()`.
///
/// Providers are registered under `<pilet>:<name>`. When no name is given
/// one is allocated from a per-pilet counter, so unnamed registrations never
/// collide.
pub struct PiletSearchApi {
    pilet: String,
    names: NameAllocator,
    engine: Arc<SearchEngine>,
}

impl PiletSearchApi {
    pub(crate) fn new(pilet: impl Into<String>, engine: Arc<SearchEngine>) -> Self {
        Self {
            pilet: pilet.into(),
            names: NameAllocator::new(),
            engine,
        }
    }

    /// Register a search provider. The returned disposer unregisters it.
    pub fn register_search_provider(
        &self,
        name: Option<&str>,
        handler: Arc<dyn SearchHandler>,
        settings: SearchSettings,
    ) -> Disposer {
        let local = name.map(LocalName::from).unwrap_or_else(|| self.names.next_name());
        let key = build_name(&self.pilet, &local);
        let registration = SearchProviderRegistration::new(Some(self.pilet.clone()), handler, settings);
        self.engine.register(key.clone(), registration);

        let engine = self.engine.clone();
        Disposer::new(move || {
            engine.unregister(&key);
        })
    }

    pub fn unregister_search_provider(&self, name: impl Into<LocalName>) {
        self.engine
            .unregister(&build_name(&self.pilet, &name.into()));
    }

    pub async fn trigger_search(&self, query: &str, immediate: bool) -> SearchOutcome {
        self.engine.trigger_search(query, immediate).await
    }
}

impl fmt::Debug for PiletSearchApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiletSearchApi")
            .field("pilet", &self.pilet)
            .finish_non_exhaustive()
    }
}
