//! Obtaining pilet modules from descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pilet_feed::{
    FeedError, HttpExecutor, HttpRequest, PiletDescriptor, PiletSource, ReqwestExecutor,
};

use crate::error::{BoxError, LoaderError, Result};
use crate::module::PiletModule;

/// Fetches and instantiates the code behind a descriptor.
///
/// This is the only place that knows how pilet code is obtained and
/// executed; the loader itself only sees the resulting module.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load_module(&self, descriptor: &PiletDescriptor) -> Result<Arc<dyn PiletModule>>;
}

#[async_trait]
impl<T: ModuleLoader + ?Sized> ModuleLoader for Arc<T> {
    async fn load_module(&self, descriptor: &PiletDescriptor) -> Result<Arc<dyn PiletModule>> {
        (**self).load_module(descriptor).await
    }
}

/// Modules compiled into the host, looked up by pilet name.
#[derive(Default, Clone)]
pub struct StaticModuleLoader {
    modules: HashMap<String, Arc<dyn PiletModule>>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, module: impl PiletModule + 'static) -> Self {
        self.insert(name, Arc::new(module));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, module: Arc<dyn PiletModule>) {
        self.modules.insert(name.into(), module);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn load_module(&self, descriptor: &PiletDescriptor) -> Result<Arc<dyn PiletModule>> {
        self.modules
            .get(&descriptor.name)
            .cloned()
            .ok_or_else(|| LoaderError::ModuleNotFound {
                name: descriptor.name.clone(),
            })
    }
}

/// Turns pilet source text into a module.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, descriptor: &PiletDescriptor, source: &str)
        -> std::result::Result<Arc<dyn PiletModule>, BoxError>;
}

/// Obtains source from inline content or the descriptor's link, then
/// hands it to an [`Evaluator`].
pub struct FetchModuleLoader<V, E = ReqwestExecutor> {
    evaluator: V,
    executor: E,
}

impl<V: Evaluator> FetchModuleLoader<V, ReqwestExecutor> {
    pub fn new(evaluator: V) -> Result<Self> {
        let executor = ReqwestExecutor::with_default_timeout().map_err(LoaderError::Client)?;
        Ok(Self::with_executor(evaluator, executor))
    }
}

impl<V: Evaluator, E: HttpExecutor> FetchModuleLoader<V, E> {
    pub fn with_executor(evaluator: V, executor: E) -> Self {
        Self {
            evaluator,
            executor,
        }
    }

    async fn fetch_source(&self, name: &str, link: &str) -> Result<String> {
        let fetch_error = |source| LoaderError::Fetch {
            name: name.to_string(),
            source,
        };

        let response = self
            .executor
            .execute(&HttpRequest::get(link))
            .await
            .map_err(|message| fetch_error(FeedError::Transport(message)))?;

        if !response.is_success() {
            return Err(fetch_error(FeedError::Status {
                url: link.to_string(),
                status: response.status,
            }));
        }
        Ok(response.body_text)
    }
}

#[async_trait]
impl<V: Evaluator, E: HttpExecutor> ModuleLoader for FetchModuleLoader<V, E> {
    async fn load_module(&self, descriptor: &PiletDescriptor) -> Result<Arc<dyn PiletModule>> {
        let fetched;
        let source = match descriptor.source() {
            PiletSource::Inline(content) => content,
            PiletSource::Link(link) => {
                tracing::debug!(pilet = %descriptor.name, link, "fetching pilet code");
                fetched = self.fetch_source(&descriptor.name, link).await?;
                fetched.as_str()
            }
            PiletSource::Unspecified => {
                return Err(LoaderError::MissingSource {
                    name: descriptor.name.clone(),
                })
            }
        };

        self.evaluator
            .evaluate(descriptor, source)
            .map_err(|e| LoaderError::Evaluate {
                name: descriptor.name.clone(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PiletApi;
    use crate::module::Disposer;
    use pilet_feed::{HttpResponse, MockExecutor};
    use std::sync::Mutex;

    struct Noop;

    impl PiletModule for Noop {
        fn setup(&self, _api: &PiletApi) -> std::result::Result<Option<Disposer>, BoxError> {
            Ok(None)
        }
    }

    /// Records the source it was given and succeeds unless the source is
    /// `"syntax error"`.
    #[derive(Default)]
    struct RecordingEvaluator {
        sources: Mutex<Vec<String>>,
    }

    impl Evaluator for RecordingEvaluator {
        fn evaluate(
            &self,
            _descriptor: &PiletDescriptor,
            source: &str,
        ) -> std::result::Result<Arc<dyn PiletModule>, BoxError> {
            self.sources.lock().unwrap().push(source.to_string());
            if source == "syntax error" {
                return Err("unexpected token".into());
            }
            Ok(Arc::new(Noop))
        }
    }

    #[tokio::test]
    async fn static_loader_by_name() {
        let loader = StaticModuleLoader::new().with_module("a", Noop);
        assert!(loader.contains("a"));
        assert!(loader
            .load_module(&PiletDescriptor::new("a", "1"))
            .await
            .is_ok());
        assert!(matches!(
            loader.load_module(&PiletDescriptor::new("b", "1")).await,
            Err(LoaderError::ModuleNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn inline_content_skips_the_network() {
        let executor = MockExecutor::new();
        let loader = FetchModuleLoader::with_executor(RecordingEvaluator::default(), executor.clone());

        let descriptor = PiletDescriptor::new("a", "1")
            .with_link("https://cdn/a.js")
            .with_content("inline code");
        loader.load_module(&descriptor).await.unwrap();

        assert!(executor.recorded_requests().is_empty());
        assert_eq!(*loader.evaluator.sources.lock().unwrap(), vec!["inline code"]);
    }

    #[tokio::test]
    async fn link_is_fetched() {
        let executor =
            MockExecutor::new().with_response("https://cdn/a.js", HttpResponse::ok("remote code"));
        let loader = FetchModuleLoader::with_executor(RecordingEvaluator::default(), executor);

        loader
            .load_module(&PiletDescriptor::new("a", "1").with_link("https://cdn/a.js"))
            .await
            .unwrap();

        assert_eq!(*loader.evaluator.sources.lock().unwrap(), vec!["remote code"]);
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let loader = FetchModuleLoader::with_executor(
            RecordingEvaluator::default(),
            MockExecutor::new().with_response("https://cdn/bad.js", HttpResponse::ok("syntax error")),
        );

        let missing = loader.load_module(&PiletDescriptor::new("x", "1")).await;
        assert!(matches!(missing, Err(LoaderError::MissingSource { .. })));

        let not_found = loader
            .load_module(&PiletDescriptor::new("x", "1").with_link("https://cdn/none.js"))
            .await;
        assert!(matches!(
            not_found,
            Err(LoaderError::Fetch {
                source: FeedError::Status { status: 404, .. },
                ..
            })
        ));

        let invalid = loader
            .load_module(&PiletDescriptor::new("x", "1").with_link("https://cdn/bad.js"))
            .await;
        assert!(matches!(invalid, Err(LoaderError::Evaluate { ref message, .. }) if message == "unexpected token"));
    }
}
