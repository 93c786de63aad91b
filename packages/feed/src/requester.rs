//! Sources of pilet lists.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::FeedConfig;
use crate::descriptor::{parse_feed, PiletDescriptor};
use crate::error::{FeedError, Result};
use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::types::HttpRequest;

/// Produces the list of pilets a session should load.
///
/// One call is one round trip; an empty list is a legitimate answer.
#[async_trait]
pub trait PiletRequester: Send + Sync {
    async fn request_pilets(&self) -> Result<Vec<PiletDescriptor>>;
}

#[async_trait]
impl<T: PiletRequester + ?Sized> PiletRequester for Arc<T> {
    async fn request_pilets(&self) -> Result<Vec<PiletDescriptor>> {
        (**self).request_pilets().await
    }
}

/// GET a feed endpoint and normalize its answer.
pub async fn fetch_descriptors<E>(executor: &E, request: &HttpRequest) -> Result<Vec<PiletDescriptor>>
where
    E: HttpExecutor + ?Sized,
{
    let response = executor
        .execute(request)
        .await
        .map_err(FeedError::Transport)?;

    if !response.is_success() {
        return Err(FeedError::Status {
            url: request.url.clone(),
            status: response.status,
        });
    }

    parse_feed(response.json()?)
}

/// Requests pilets from an HTTP feed service.
pub struct FeedRequester<E = ReqwestExecutor> {
    url: Url,
    headers: HashMap<String, String>,
    executor: E,
}

impl FeedRequester<ReqwestExecutor> {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let executor = ReqwestExecutor::new(config.timeout()).map_err(FeedError::Transport)?;
        Ok(Self::with_executor(Url::parse(&config.url)?, executor).with_headers(config.headers.clone()))
    }
}

impl<E: HttpExecutor> FeedRequester<E> {
    pub fn with_executor(url: Url, executor: E) -> Self {
        Self {
            url,
            headers: HashMap::new(),
            executor,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl<E: HttpExecutor> PiletRequester for FeedRequester<E> {
    async fn request_pilets(&self) -> Result<Vec<PiletDescriptor>> {
        let request = HttpRequest::get(self.url.as_str()).with_headers(&self.headers);
        let pilets = fetch_descriptors(&self.executor, &request).await?;
        tracing::debug!(url = %self.url, count = pilets.len(), "received pilet feed");
        Ok(pilets)
    }
}

/// A requester that never returns pilets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPilets;

#[async_trait]
impl PiletRequester for NoPilets {
    async fn request_pilets(&self) -> Result<Vec<PiletDescriptor>> {
        Ok(Vec::new())
    }
}

/// A requester returning a fixed list, e.g. pilets bundled with the host.
#[derive(Debug, Clone, Default)]
pub struct StaticRequester {
    pilets: Vec<PiletDescriptor>,
}

impl StaticRequester {
    pub fn new(pilets: Vec<PiletDescriptor>) -> Self {
        Self { pilets }
    }
}

#[async_trait]
impl PiletRequester for StaticRequester {
    async fn request_pilets(&self) -> Result<Vec<PiletDescriptor>> {
        Ok(self.pilets.clone())
    }
}
