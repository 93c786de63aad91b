//! Fan-out search over the registered providers.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use pilet_registry::ProviderRegistry;
use pilet_state::{with_all, with_path, StateContainer, StatePath, Update, Value};
use serde_json::json;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

use crate::error::{Result, SearchError};
use crate::handler::{SearchProviderRegistration, SearchQuery};

/// Narrows the providers queried for a search, by key.
pub type ProviderFilter = Arc<dyn Fn(&str, &[String]) -> Vec<String> + Send + Sync>;

/// How a search request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Merged results, in provider registration order.
    Completed(Vec<Value>),
    /// A newer search or a reset started before this one finished.
    Superseded,
    /// The query was empty and empty queries do not reach providers.
    Reset,
}

/// Runs searches across every registered provider and publishes the
/// results to the `search` state domain.
///
/// Each search gets a generation number. Starting a search or resetting
/// supersedes whatever was in flight: providers whose call is still
/// running are told to cancel, and results that arrive for an older
/// generation are dropped.
pub struct SearchEngine {
    providers: ProviderRegistry<SearchProviderRegistration>,
    container: Arc<StateContainer>,
    empty_trigger: bool,
    filter: Option<ProviderFilter>,
    generation: watch::Sender<u64>,
    in_flight: Mutex<Vec<(String, AbortHandle)>>,
}

impl SearchEngine {
    pub fn new(container: Arc<StateContainer>) -> Self {
        Self {
            providers: ProviderRegistry::new(),
            container,
            empty_trigger: false,
            filter: None,
            generation: watch::Sender::new(0),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Also query providers when the query is empty.
    #[must_use]
    pub fn with_empty_trigger(mut self, empty_trigger: bool) -> Self {
        self.empty_trigger = empty_trigger;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ProviderFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn providers(&self) -> &ProviderRegistry<SearchProviderRegistration> {
        &self.providers
    }

    pub fn register(&self, key: impl Into<String>, registration: SearchProviderRegistration) {
        let key = key.into();
        tracing::debug!(provider = %key, "registered search provider");
        self.providers.register(key, registration);
        self.publish_providers();
    }

    /// Remove a provider. Unknown keys are ignored.
    pub fn unregister(&self, key: &str) -> bool {
        let removed = self.providers.unregister(key).is_some();
        if removed {
            tracing::debug!(provider = %key, "unregistered search provider");
            self.publish_providers();
        }
        removed
    }

    /// Remove every provider a pilet registered.
    pub fn unregister_pilet(&self, pilet: &str) -> Vec<String> {
        let removed = self.providers.unregister_namespace(pilet);
        if !removed.is_empty() {
            tracing::debug!(pilet, count = removed.len(), "swept search providers");
            self.publish_providers();
        }
        removed
    }

    /// Search every eligible provider and merge their results.
    ///
    /// A provider that fails contributes nothing; the others are
    /// unaffected.
    pub async fn trigger_search(&self, query: &str, immediate: bool) -> SearchOutcome {
        let generation = self.supersede();

        if query.is_empty() && !self.empty_trigger {
            self.clear_all();
            self.container.dispatch(reset_state(query));
            return SearchOutcome::Reset;
        }

        self.container.dispatch(with_all([
            with_path(StatePath::from(["search", "input"]), json!(query)),
            with_path(StatePath::from(["search", "results", "loading"]), json!(true)),
        ]));

        let request = SearchQuery::new(query, immediate);
        let tasks: Vec<(String, JoinHandle<Result<Vec<Value>>>)> = self
            .select(query, immediate)
            .into_iter()
            .map(|(key, provider)| {
                let request = request.clone();
                let task = tokio::spawn(async move { provider.search.search(request).await });
                (key, task)
            })
            .collect();

        if !self.track(generation, &tasks) {
            return SearchOutcome::Superseded;
        }

        let superseded = self.superseded(generation);
        tokio::pin!(superseded);

        let mut items = Vec::new();
        let mut tasks = tasks.into_iter();
        while let Some((key, mut task)) = tasks.next() {
            let joined = tokio::select! {
                biased;
                () = &mut superseded => None,
                joined = &mut task => Some(joined),
            };
            let Some(joined) = joined else {
                task.abort();
                for (_, rest) in tasks.by_ref() {
                    rest.abort();
                }
                tracing::debug!(query, "discarding results of superseded search");
                return SearchOutcome::Superseded;
            };
            match joined.map_err(SearchError::from).and_then(|result| result) {
                Ok(results) => items.extend(results),
                Err(e) => tracing::debug!(provider = %key, error = %e, "search provider failed"),
            }
        }

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if self.is_superseded(generation) {
                tracing::debug!(query, "discarding results of superseded search");
                return SearchOutcome::Superseded;
            }
            in_flight.clear();
        }

        self.container.dispatch(with_path(
            StatePath::from(["search", "results"]),
            json!({ "loading": false, "items": items }),
        ));
        SearchOutcome::Completed(items)
    }

    /// Drop the current results, clearing every provider.
    pub fn reset_search(&self, query: &str) {
        self.container.dispatch(self.reset(query));
    }

    /// Supersede in-flight searches and clear providers, returning the
    /// state update that empties the results.
    pub(crate) fn reset(&self, query: &str) -> Update {
        self.supersede();
        self.clear_all();
        reset_state(query)
    }

    /// Start a new generation, aborting the calls of the previous one and
    /// cancelling the providers that had not answered yet.
    fn supersede(&self) -> u64 {
        let mut generation = 0;
        self.generation.send_modify(|current| {
            *current += 1;
            generation = *current;
        });

        let abandoned = std::mem::take(
            &mut *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for (key, call) in abandoned {
            if call.is_finished() {
                continue;
            }
            call.abort();
            if let Some(provider) = self.providers.get(&key) {
                tracing::trace!(provider = %key, "cancelling superseded search");
                (provider.cancel)();
            }
        }
        generation
    }

    /// Record the calls of `generation` so a later supersede can cancel
    /// them. Returns false, after aborting them, when the generation is
    /// already stale.
    fn track(&self, generation: u64, tasks: &[(String, JoinHandle<Result<Vec<Value>>>)]) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_superseded(generation) {
            for (_, task) in tasks {
                task.abort();
            }
            return false;
        }
        *in_flight = tasks
            .iter()
            .map(|(key, task)| (key.clone(), task.abort_handle()))
            .collect();
        true
    }

    fn is_superseded(&self, generation: u64) -> bool {
        *self.generation.borrow() != generation
    }

    /// Resolves once a generation other than `generation` starts.
    async fn superseded(&self, generation: u64) {
        let mut changes = self.generation.subscribe();
        loop {
            if *changes.borrow_and_update() != generation {
                return;
            }
            if changes.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    fn clear_all(&self) {
        for provider in self.providers.list() {
            (provider.clear)();
        }
    }

    fn select(&self, query: &str, immediate: bool) -> Vec<(String, Arc<SearchProviderRegistration>)> {
        let mut providers = self.providers.entries();
        if let Some(filter) = &self.filter {
            let keys: Vec<String> = providers.iter().map(|(key, _)| key.clone()).collect();
            let allowed = filter(query, &keys);
            providers.retain(|(key, _)| allowed.contains(key));
        }
        providers.retain(|(_, provider)| provider.accepts(immediate));
        providers
    }

    fn publish_providers(&self) {
        let keys = self.providers.keys();
        self.container.dispatch(with_path(
            StatePath::from(["registry", "searchProviders"]),
            json!(keys),
        ));
    }
}

impl fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchEngine")
            .field("providers", &self.providers.keys())
            .field("empty_trigger", &self.empty_trigger)
            .field("generation", &*self.generation.borrow())
            .finish()
    }
}

fn reset_state(query: &str) -> Update {
    with_path(
        StatePath::from(["search"]),
        json!({ "input": query, "results": { "loading": false, "items": [] } }),
    )
}
