//! The pilet loader: owns the pilets loaded into a session.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use pilet_feed::PiletDescriptor;
use pilet_state::{GlobalState, Update, Value};
use serde_json::{json, Map};
use tokio::sync::Mutex;

use crate::api::{Extensions, HostContext, PiletApi};
use crate::error::{LoaderError, Result};
use crate::module::{Disposer, PiletModule};
use crate::plugin::HostPlugin;
use crate::source::ModuleLoader;

/// State domain listing the loaded pilets by name.
pub const MODULES_DOMAIN: &str = "modules";

/// Runtime record of a pilet whose setup has returned.
struct LoadedPilet {
    descriptor: PiletDescriptor,
    module: Arc<dyn PiletModule>,
    api: PiletApi,
    disposer: Option<Disposer>,
}

/// Loads, swaps, and unloads pilets.
///
/// At most one pilet per name is loaded at any time. Loading a name that is
/// already loaded unloads the old pilet first, so its disposer runs before
/// the replacement's setup.
pub struct PiletLoader {
    context: HostContext,
    modules: Arc<dyn ModuleLoader>,
    plugins: Vec<Arc<dyn HostPlugin>>,
    loaded: Mutex<IndexMap<String, LoadedPilet>>,
}

impl PiletLoader {
    pub fn new(context: HostContext, modules: Arc<dyn ModuleLoader>) -> Self {
        Self {
            context,
            modules,
            plugins: Vec::new(),
            loaded: Mutex::new(IndexMap::new()),
        }
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    /// Install a host plugin. Plugins must be installed before pilets are
    /// loaded; pilets only see the plugins present at their setup.
    pub fn install(&mut self, plugin: Arc<dyn HostPlugin>) -> Result<()> {
        plugin.install(&self.context).map_err(|e| match e {
            LoaderError::Action(source) => LoaderError::Plugin {
                plugin: plugin.name().to_string(),
                source,
            },
            other => other,
        })?;
        tracing::debug!(plugin = plugin.name(), "installed host plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Fetch, evaluate, and set up a pilet.
    pub async fn load(&self, descriptor: PiletDescriptor) -> Result<()> {
        let module = self.modules.load_module(&descriptor).await?;

        let mut loaded = self.loaded.lock().await;
        if loaded.contains_key(&descriptor.name) {
            tracing::debug!(pilet = %descriptor.name, "replacing loaded pilet");
            self.unload_entry(&mut loaded, &descriptor.name);
        }

        let record = self.setup(descriptor, module)?;
        self.context
            .container()
            .dispatch(with_module(&record.descriptor));
        tracing::info!(
            pilet = %record.descriptor.name,
            version = %record.descriptor.version,
            "loaded pilet"
        );
        loaded.insert(record.descriptor.name.clone(), record);
        Ok(())
    }

    /// Load pilets one after another, skipping those that fail.
    ///
    /// Returns the names that were loaded.
    pub async fn load_all(&self, descriptors: impl IntoIterator<Item = PiletDescriptor>) -> Vec<String> {
        let mut names = Vec::new();
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            match self.load(descriptor).await {
                Ok(()) => names.push(name),
                Err(e) => tracing::error!(pilet = %name, error = %e, "failed to load pilet"),
            }
        }
        names
    }

    /// Unload a pilet. Returns `false` if no pilet of that name was loaded.
    pub async fn unload(&self, name: &str) -> bool {
        let mut loaded = self.loaded.lock().await;
        self.unload_entry(&mut loaded, name)
    }

    /// Unload every pilet, most recently loaded first.
    pub async fn unload_all(&self) -> usize {
        let mut loaded = self.loaded.lock().await;
        let names: Vec<String> = loaded.keys().rev().cloned().collect();
        for name in &names {
            self.unload_entry(&mut loaded, name);
        }
        names.len()
    }

    /// Descriptors of the loaded pilets, in load order.
    pub async fn loaded(&self) -> Vec<PiletDescriptor> {
        self.loaded
            .lock()
            .await
            .values()
            .map(|record| record.descriptor.clone())
            .collect()
    }

    pub async fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().await.contains_key(name)
    }

    fn setup(&self, descriptor: PiletDescriptor, module: Arc<dyn PiletModule>) -> Result<LoadedPilet> {
        let mut extensions = Extensions::new();
        for plugin in &self.plugins {
            plugin.extend(&descriptor, &self.context, &mut extensions);
        }
        let api = PiletApi::new(descriptor.clone(), self.context.clone(), extensions);

        let disposer = match catch_unwind(AssertUnwindSafe(|| module.setup(&api))) {
            Ok(Ok(disposer)) => disposer,
            Ok(Err(e)) => return Err(self.abort_setup(&api, e.to_string())),
            Err(panic) => return Err(self.abort_setup(&api, panic_message(panic.as_ref()))),
        };

        Ok(LoadedPilet {
            descriptor,
            module,
            api,
            disposer,
        })
    }

    /// Sweep whatever a failed setup registered before it gave up.
    fn abort_setup(&self, api: &PiletApi, message: String) -> LoaderError {
        api.release_subscriptions();
        for plugin in &self.plugins {
            plugin.on_unload(api.name(), &self.context);
        }
        LoaderError::Setup {
            name: api.name().to_string(),
            message,
        }
    }

    fn unload_entry(&self, loaded: &mut IndexMap<String, LoadedPilet>, name: &str) -> bool {
        let Some(record) = loaded.shift_remove(name) else {
            return false;
        };
        let LoadedPilet {
            descriptor,
            module,
            api,
            disposer,
        } = record;

        // A failing disposer must not keep the pilet loaded.
        if let Some(disposer) = disposer {
            match catch_unwind(AssertUnwindSafe(|| disposer.dispose())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(pilet = %name, error = %e, "pilet disposer failed"),
                Err(panic) => tracing::warn!(
                    pilet = %name,
                    error = %panic_message(panic.as_ref()),
                    "pilet disposer panicked"
                ),
            }
        }
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| module.teardown(&api))) {
            tracing::warn!(
                pilet = %name,
                error = %panic_message(panic.as_ref()),
                "pilet teardown panicked"
            );
        }

        api.release_subscriptions();
        for plugin in &self.plugins {
            plugin.on_unload(name, &self.context);
        }
        self.context.container().dispatch(without_module(name));

        tracing::info!(pilet = %name, version = %descriptor.version, "unloaded pilet");
        true
    }
}

impl std::fmt::Debug for PiletLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("PiletLoader")
            .field("plugins", &plugins)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn modules_of(state: &GlobalState) -> Map<String, Value> {
    match state.domain(MODULES_DOMAIN) {
        Some(Value::Object(modules)) => modules.clone(),
        _ => Map::new(),
    }
}

fn with_module(descriptor: &PiletDescriptor) -> Update {
    let name = descriptor.name.clone();
    let entry = json!({
        "name": descriptor.name,
        "version": descriptor.version,
        "spec": descriptor.spec,
        "link": descriptor.link,
    });
    Update::new(move |state| {
        let mut modules = modules_of(&state);
        modules.insert(name, entry);
        state.with_domain(MODULES_DOMAIN, Value::Object(modules))
    })
}

fn without_module(name: &str) -> Update {
    let name = name.to_string();
    Update::new(move |state| {
        let mut modules = modules_of(&state);
        modules.remove(&name);
        state.with_domain(MODULES_DOMAIN, Value::Object(modules))
    })
}
