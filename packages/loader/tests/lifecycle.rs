use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pilet_feed::{PiletDescriptor, ReqwestExecutor};
use pilet_loader::{
    BoxError, Disposer, Evaluator, Extensions, FetchModuleLoader, FnModule, HostContext,
    HostPlugin, LoaderError, PiletApi, PiletLoader, PiletModule, StaticModuleLoader,
};
use pilet_registry::{build_name, LocalName, NameAllocator, ProviderRegistry};
use pilet_state::{action, state_path, with_path};

/// Capability handed to each pilet: register named payloads.
struct ProviderApi {
    pilet: String,
    names: NameAllocator,
    registry: Arc<ProviderRegistry<String>>,
}

impl ProviderApi {
    fn register(&self, name: Option<&str>, payload: &str) -> Disposer {
        let local = name.map(LocalName::from).unwrap_or_else(|| self.names.next_name());
        let key = build_name(&self.pilet, &local);
        self.registry.register(key.clone(), payload.to_string());
        let registry = self.registry.clone();
        Disposer::new(move || {
            registry.unregister(&key);
        })
    }
}

struct ProviderPlugin {
    registry: Arc<ProviderRegistry<String>>,
    sweeps: AtomicUsize,
}

impl ProviderPlugin {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(ProviderRegistry::new()),
            sweeps: AtomicUsize::new(0),
        })
    }
}

impl HostPlugin for ProviderPlugin {
    fn name(&self) -> &str {
        "providers"
    }

    fn install(&self, context: &HostContext) -> pilet_loader::Result<()> {
        context.actions().define_action(
            "setProviderCount",
            action(|_, args| vec![with_path(state_path!("registry/providerCount"), args.clone())]),
        )?;
        Ok(())
    }

    fn extend(&self, pilet: &PiletDescriptor, _context: &HostContext, extensions: &mut Extensions) {
        extensions.insert(ProviderApi {
            pilet: pilet.name.clone(),
            names: NameAllocator::new(),
            registry: self.registry.clone(),
        });
    }

    fn on_unload(&self, pilet: &str, _context: &HostContext) {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        self.registry.unregister_namespace(pilet);
    }
}

fn registering_module(payloads: &'static [&'static str]) -> impl PiletModule {
    FnModule::new(move |api: &PiletApi| {
        let providers = api.extension::<ProviderApi>().ok_or("no provider api")?;
        let disposers: Vec<Disposer> = payloads.iter().map(|p| providers.register(None, p)).collect();
        Ok(Some(Disposer::all(disposers)))
    })
}

async fn loader_with(modules: StaticModuleLoader, plugin: Arc<ProviderPlugin>) -> PiletLoader {
    let mut loader = PiletLoader::new(HostContext::empty(), Arc::new(modules));
    loader.install(plugin).unwrap();
    loader
}

#[tokio::test]
async fn load_then_unload_leaves_no_registrations() {
    let plugin = ProviderPlugin::new();
    let modules = StaticModuleLoader::new().with_module("a", registering_module(&["x", "y"]));
    let loader = loader_with(modules, plugin.clone()).await;

    loader.load(PiletDescriptor::new("a", "1")).await.unwrap();
    assert_eq!(plugin.registry.keys(), vec!["a:0".to_string(), "a:1".to_string()]);

    assert!(loader.unload("a").await);
    assert!(plugin.registry.is_empty());
    assert!(!loader.is_loaded("a").await);
}

#[tokio::test]
async fn sweep_removes_registrations_a_pilet_forgot() {
    let plugin = ProviderPlugin::new();
    let leaky = FnModule::new(|api: &PiletApi| {
        let providers = api.extension::<ProviderApi>().ok_or("no provider api")?;
        let _ = providers.register(Some("leak"), "z");
        Ok(None)
    });
    let modules = StaticModuleLoader::new()
        .with_module("leaky", leaky)
        .with_module("b", registering_module(&["b"]));
    let loader = loader_with(modules, plugin.clone()).await;

    loader.load(PiletDescriptor::new("leaky", "1")).await.unwrap();
    loader.load(PiletDescriptor::new("b", "1")).await.unwrap();
    loader.unload("leaky").await;

    assert_eq!(plugin.registry.keys(), vec!["b:0".to_string()]);
}

#[tokio::test]
async fn loading_same_name_disposes_previous_first() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let module = {
        let events = events.clone();
        FnModule::new(move |api: &PiletApi| {
            let version = api.meta().version.clone();
            events.lock().unwrap().push(format!("setup {version}"));
            let events = events.clone();
            Ok(Some(Disposer::new(move || {
                events.lock().unwrap().push(format!("dispose {version}"));
            })))
        })
    };
    let loader = loader_with(StaticModuleLoader::new().with_module("a", module), ProviderPlugin::new()).await;

    loader.load(PiletDescriptor::new("a", "1")).await.unwrap();
    loader.load(PiletDescriptor::new("a", "2")).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["setup 1", "dispose 1", "setup 2"]
    );
    let loaded = loader.loaded().await;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].version, "2");
}

#[tokio::test]
async fn failing_disposer_still_unloads() {
    let plugin = ProviderPlugin::new();
    let failing = FnModule::new(|_: &PiletApi| {
        Ok(Some(Disposer::fallible(|| Err("cleanup failed".into()))))
    });
    let panicking = FnModule::new(|_: &PiletApi| Ok(Some(Disposer::new(|| panic!("cleanup panicked")))));
    let modules = StaticModuleLoader::new()
        .with_module("failing", failing)
        .with_module("panicking", panicking);
    let loader = loader_with(modules, plugin.clone()).await;

    loader.load(PiletDescriptor::new("failing", "1")).await.unwrap();
    loader.load(PiletDescriptor::new("panicking", "1")).await.unwrap();

    assert!(loader.unload("failing").await);
    assert!(loader.unload("panicking").await);
    assert!(loader.loaded().await.is_empty());
    assert_eq!(plugin.sweeps.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_setup_is_not_loaded_and_is_swept() {
    let plugin = ProviderPlugin::new();
    let broken = FnModule::new(|api: &PiletApi| {
        let providers = api.extension::<ProviderApi>().ok_or("no provider api")?;
        let _ = providers.register(None, "half");
        Err::<Option<Disposer>, BoxError>("setup exploded".into())
    });
    let loader = loader_with(StaticModuleLoader::new().with_module("broken", broken), plugin.clone()).await;

    let err = loader.load(PiletDescriptor::new("broken", "1")).await.unwrap_err();

    assert!(matches!(err, LoaderError::Setup { ref message, .. } if message == "setup exploded"));
    assert!(!loader.is_loaded("broken").await);
    assert!(plugin.registry.is_empty());
}

#[tokio::test]
async fn load_all_skips_failures_and_unload_all_reverses() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let tracking = |name: &'static str| {
        let order = order.clone();
        FnModule::new(move |_: &PiletApi| {
            let order = order.clone();
            Ok(Some(Disposer::new(move || order.lock().unwrap().push(name))))
        })
    };
    let modules = StaticModuleLoader::new()
        .with_module("a", tracking("a"))
        .with_module("c", tracking("c"));
    let loader = loader_with(modules, ProviderPlugin::new()).await;

    let names = loader
        .load_all(vec![
            PiletDescriptor::new("a", "1"),
            PiletDescriptor::new("missing", "1"),
            PiletDescriptor::new("c", "1"),
        ])
        .await;
    assert_eq!(names, vec!["a".to_string(), "c".to_string()]);

    assert_eq!(loader.unload_all().await, 2);
    assert_eq!(*order.lock().unwrap(), vec!["c", "a"]);
}

#[tokio::test]
async fn plugin_actions_are_available_to_pilets() {
    let module = FnModule::new(|api: &PiletApi| {
        api.call_action("setProviderCount", json!(3))?;
        Ok(None)
    });
    let loader = loader_with(StaticModuleLoader::new().with_module("a", module), ProviderPlugin::new()).await;

    loader.load(PiletDescriptor::new("a", "1")).await.unwrap();

    let count = loader
        .context()
        .container()
        .read_path(&state_path!("registry/providerCount"));
    assert_eq!(count, Some(json!(3)));
}

#[tokio::test]
async fn installing_a_plugin_twice_is_a_definition_conflict() {
    let mut loader = PiletLoader::new(HostContext::empty(), Arc::new(StaticModuleLoader::new()));
    loader.install(ProviderPlugin::new()).unwrap();
    let err = loader.install(ProviderPlugin::new()).unwrap_err();
    assert!(matches!(err, LoaderError::Plugin { ref plugin, .. } if plugin == "providers"));
}

#[tokio::test]
async fn pilet_subscriptions_end_with_the_pilet() {
    let module = FnModule::new(|api: &PiletApi| {
        api.subscribe(|_| {});
        Ok(None)
    });
    let loader = loader_with(StaticModuleLoader::new().with_module("a", module), ProviderPlugin::new()).await;
    let container = loader.context().container().clone();

    loader.load(PiletDescriptor::new("a", "1")).await.unwrap();
    assert_eq!(container.subscriber_count(), 1);
    loader.unload("a").await;
    assert_eq!(container.subscriber_count(), 0);
}

/// Treats the fetched source as the list of payloads to register.
struct PayloadEvaluator;

impl Evaluator for PayloadEvaluator {
    fn evaluate(&self, _descriptor: &PiletDescriptor, source: &str) -> Result<Arc<dyn PiletModule>, BoxError> {
        let payloads: Vec<String> = serde_json::from_str(source)?;
        Ok(Arc::new(FnModule::new(move |api: &PiletApi| {
            let providers = api.extension::<ProviderApi>().ok_or("no provider api")?;
            let disposers: Vec<Disposer> = payloads.iter().map(|p| providers.register(None, p)).collect();
            Ok(Some(Disposer::all(disposers)))
        })))
    }
}

#[tokio::test]
async fn fetch_loader_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a/index.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["remote"]"#))
        .mount(&server)
        .await;

    let plugin = ProviderPlugin::new();
    let modules = FetchModuleLoader::with_executor(
        PayloadEvaluator,
        ReqwestExecutor::with_default_timeout().unwrap(),
    );
    let mut loader = PiletLoader::new(HostContext::empty(), Arc::new(modules));
    loader.install(plugin.clone()).unwrap();

    let descriptor = PiletDescriptor::new("a", "1").with_link(format!("{}/a/index.js", server.uri()));
    loader.load(descriptor).await.unwrap();
    assert_eq!(plugin.registry.get("a:0").as_deref(), Some(&"remote".to_string()));

    let missing = PiletDescriptor::new("b", "1").with_link(format!("{}/b/index.js", server.uri()));
    assert!(matches!(
        loader.load(missing).await,
        Err(LoaderError::Fetch { .. })
    ));
}
