//! The debug-session pilet requester.

use std::sync::Arc;

use async_trait::async_trait;
use pilet_feed::{
    fetch_descriptors, reconcile, HttpExecutor, HttpRequest, PiletDescriptor, PiletRequester,
    ReqwestExecutor, Result,
};
use url::Url;

use crate::config::DebugConfig;
use crate::endpoint::resolve_pilet_api;
use crate::session::SessionContext;

/// Wraps a feed requester for debug sessions.
///
/// The feed is only consulted when `dbg:load-pilets` is on, and a failing
/// feed is treated as empty. The pilets served by the pilet API are then
/// merged in, overriding feed pilets of the same name.
pub struct EmulatorRequester<R, E = ReqwestExecutor> {
    feed: R,
    session: Arc<SessionContext>,
    config: DebugConfig,
    executor: E,
}

impl<R: PiletRequester> EmulatorRequester<R, ReqwestExecutor> {
    pub fn new(feed: R, session: Arc<SessionContext>, config: DebugConfig) -> Result<Self> {
        let executor =
            ReqwestExecutor::with_default_timeout().map_err(pilet_feed::FeedError::Transport)?;
        Ok(Self::with_executor(feed, session, config, executor))
    }
}

impl<R: PiletRequester, E: HttpExecutor> EmulatorRequester<R, E> {
    pub fn with_executor(feed: R, session: Arc<SessionContext>, config: DebugConfig, executor: E) -> Self {
        Self {
            feed,
            session,
            config,
            executor,
        }
    }

    /// Where the debug pilets are served for this session.
    pub fn pilet_api(&self) -> Result<Url> {
        Ok(resolve_pilet_api(&self.session, &self.config)?)
    }

    async fn feed_pilets(&self) -> Vec<PiletDescriptor> {
        if !self.session.load_pilets() {
            return Vec::new();
        }
        match self.feed.request_pilets().await {
            Ok(pilets) => pilets,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "requesting the pilets failed, continuing without feed pilets"
                );
                Vec::new()
            }
        }
    }

    async fn debug_pilets(&self) -> Result<Vec<PiletDescriptor>> {
        let target = self.pilet_api()?;
        match fetch_descriptors(&self.executor, &HttpRequest::get(target.as_str())).await {
            Ok(pilets) => Ok(pilets),
            Err(e) => {
                tracing::warn!(url = %target, error = %e, "fetching debug pilets failed");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl<R: PiletRequester, E: HttpExecutor> PiletRequester for EmulatorRequester<R, E> {
    async fn request_pilets(&self) -> Result<Vec<PiletDescriptor>> {
        let feed = self.feed_pilets().await;
        let debug = self.debug_pilets().await?;
        Ok(reconcile(feed, debug))
    }
}
