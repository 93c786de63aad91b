//! Wiring a session together.

use std::sync::Arc;

use pilet_debug::{
    resolve_pilet_api, socket_url, EmulatorRequester, LiveReloadChannel, LoaderTarget,
    ReloadConnector, SessionContext,
};
use pilet_feed::{FeedRequester, NoPilets, PiletRequester};
use pilet_loader::{HostContext, HostPlugin, ModuleLoader, PiletLoader, StaticModuleLoader};
use pilet_state::{ActionDispatcher, StateContainer};

use crate::config::InstanceConfig;
use crate::error::{Error, Result};

/// A running pilet host: state, actions, plugins and loaded pilets.
pub struct Instance {
    loader: Arc<PiletLoader>,
    requester: Arc<dyn PiletRequester>,
    session: Arc<SessionContext>,
    config: InstanceConfig,
}

impl Instance {
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    pub fn container(&self) -> &Arc<StateContainer> {
        self.loader.context().container()
    }

    pub fn actions(&self) -> &Arc<ActionDispatcher> {
        self.loader.context().actions()
    }

    pub fn loader(&self) -> &Arc<PiletLoader> {
        &self.loader
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Request the pilets and load them.
    ///
    /// A failing feed leaves the host running with no pilets. Returns the
    /// names of the pilets that were loaded.
    pub async fn start(&self) -> Vec<String> {
        let pilets = match self.requester.request_pilets().await {
            Ok(pilets) => pilets,
            Err(e) => {
                tracing::error!(error = %e, "requesting pilets failed, starting without pilets");
                Vec::new()
            }
        };
        tracing::debug!(count = pilets.len(), "loading pilets");
        self.loader.load_all(pilets).await
    }

    /// Unload everything and start again.
    pub async fn restart(&self) -> Vec<String> {
        let unloaded = self.loader.unload_all().await;
        tracing::info!(unloaded, "restarting session");
        self.start().await
    }

    /// Run the live-reload channel until its transport closes.
    ///
    /// Pilets are swapped in place; a full reload request restarts the
    /// session and keeps the channel running.
    pub async fn run_live_reload(&self, connector: &dyn ReloadConnector) -> Result<()> {
        let debug = self.config.debug.as_ref().ok_or(Error::DebugDisabled)?;
        let url = socket_url(&resolve_pilet_api(&self.session, debug).map_err(pilet_debug::ReloadError::from)?)?;

        let (target, mut reloads) = LoaderTarget::new(self.loader.clone());
        let channel = LiveReloadChannel::new(self.session.clone());

        let run = channel.run(connector, &url, &target);
        tokio::pin!(run);
        loop {
            tokio::select! {
                biased;
                Some(()) = reloads.recv() => {
                    self.restart().await;
                }
                result = &mut run => {
                    // A reload requested by the last message is still owed.
                    if reloads.try_recv().is_ok() {
                        while reloads.try_recv().is_ok() {}
                        self.restart().await;
                    }
                    return Ok(result?);
                }
            }
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("session", &self.session.id())
            .field("loader", &self.loader)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`Instance`].
#[derive(Default)]
pub struct InstanceBuilder {
    context: Option<HostContext>,
    modules: Option<Arc<dyn ModuleLoader>>,
    requester: Option<Arc<dyn PiletRequester>>,
    plugins: Vec<Arc<dyn HostPlugin>>,
    session: Option<Arc<SessionContext>>,
    config: InstanceConfig,
}

impl InstanceBuilder {
    pub fn config(mut self, config: InstanceConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing state container and dispatcher.
    pub fn context(mut self, context: HostContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn modules(mut self, modules: impl ModuleLoader + 'static) -> Self {
        self.modules = Some(Arc::new(modules));
        self
    }

    /// Use this requester instead of the configured feed.
    pub fn requester(mut self, requester: impl PiletRequester + 'static) -> Self {
        self.requester = Some(Arc::new(requester));
        self
    }

    pub fn plugin(mut self, plugin: impl HostPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn plugin_arc(mut self, plugin: Arc<dyn HostPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn session(mut self, session: Arc<SessionContext>) -> Self {
        self.session = Some(session);
        self
    }

    /// Install the plugins and assemble the instance. No pilets are loaded
    /// until [`Instance::start`].
    pub fn build(self) -> Result<Instance> {
        let session = self.session.unwrap_or_default();

        let mut requester: Arc<dyn PiletRequester> = match (self.requester, &self.config.feed) {
            (Some(requester), _) => requester,
            (None, Some(feed)) => Arc::new(FeedRequester::new(feed)?),
            (None, None) => Arc::new(NoPilets),
        };
        if let Some(debug) = &self.config.debug {
            requester = Arc::new(EmulatorRequester::new(
                requester,
                session.clone(),
                debug.clone(),
            )?);
        }

        let modules = self
            .modules
            .unwrap_or_else(|| Arc::new(StaticModuleLoader::new()));
        let mut loader = PiletLoader::new(self.context.unwrap_or_default(), modules);
        for plugin in self.plugins {
            loader.install(plugin)?;
        }

        tracing::debug!(session = %session.id(), "built pilet instance");
        Ok(Instance {
            loader: Arc::new(loader),
            requester,
            session,
            config: self.config,
        })
    }
}
