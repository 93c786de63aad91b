//! Search handlers and the registrations that carry them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A search request as seen by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    /// Set for the initial search of a page, cleared for live queries.
    pub immediate: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, immediate: bool) -> Self {
        Self {
            query: query.into(),
            immediate,
        }
    }
}

/// Produces result items for a query.
#[async_trait]
pub trait SearchHandler: Send + Sync {
    async fn search(&self, query: SearchQuery) -> Result<Vec<Value>>;
}

#[async_trait]
impl<F, Fut> SearchHandler for F
where
    F: Fn(SearchQuery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Value>>> + Send + 'static,
{
    async fn search(&self, query: SearchQuery) -> Result<Vec<Value>> {
        self(query).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn search_handler<F, Fut>(f: F) -> Arc<dyn SearchHandler>
where
    F: Fn(SearchQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Value>>> + Send + 'static,
{
    Arc::new(f)
}

/// Lifecycle callback attached to a provider.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

fn noop() {}

/// Optional provider settings supplied at registration.
#[derive(Clone, Default)]
pub struct SearchSettings {
    /// Only run for immediate searches.
    pub only_immediate: bool,
    /// Invoked when the provider's in-flight search is superseded.
    pub on_cancel: Option<Callback>,
    /// Invoked when the provider's accumulated results are reset.
    pub on_clear: Option<Callback>,
}

impl SearchSettings {
    pub fn only_immediate() -> Self {
        Self {
            only_immediate: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_clear(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_clear = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSettings")
            .field("only_immediate", &self.only_immediate)
            .field("on_cancel", &self.on_cancel.is_some())
            .field("on_clear", &self.on_clear.is_some())
            .finish()
    }
}

/// A registered search provider.
///
/// Missing callbacks are replaced by a no-op when the registration is built,
/// so `cancel` and `clear` can always be called.
#[derive(Clone)]
pub struct SearchProviderRegistration {
    /// Owning pilet; `None` for providers supplied by the host.
    pub pilet: Option<String>,
    pub only_immediate: bool,
    pub cancel: Callback,
    pub clear: Callback,
    pub search: Arc<dyn SearchHandler>,
}

impl SearchProviderRegistration {
    pub fn new(pilet: Option<String>, search: Arc<dyn SearchHandler>, settings: SearchSettings) -> Self {
        let SearchSettings {
            only_immediate,
            on_cancel,
            on_clear,
        } = settings;
        Self {
            pilet,
            only_immediate,
            cancel: on_cancel.unwrap_or_else(|| Arc::new(noop)),
            clear: on_clear.unwrap_or_else(|| Arc::new(noop)),
            search,
        }
    }

    /// Whether this provider takes part in a request.
    pub fn accepts(&self, immediate: bool) -> bool {
        immediate || !self.only_immediate
    }
}

impl fmt::Debug for SearchProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchProviderRegistration")
            .field("pilet", &self.pilet)
            .field("only_immediate", &self.only_immediate)
            .finish_non_exhaustive()
    }
}
