//! The search host plugin and its actions.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use pilet_feed::PiletDescriptor;
use pilet_loader::{Extensions, HostContext, HostPlugin, LoaderError};
use pilet_state::{action, with_all, with_path, with_root_extension, ActionFn, StatePath, Value};
use serde_json::json;

use crate::api::PiletSearchApi;
use crate::engine::{ProviderFilter, SearchEngine};
use crate::handler::{SearchHandler, SearchProviderRegistration, SearchSettings};

/// A provider supplied by the host rather than a pilet.
#[derive(Clone)]
pub struct InitialSearchProvider {
    pub search: Arc<dyn SearchHandler>,
    pub settings: SearchSettings,
}

impl InitialSearchProvider {
    pub fn new(search: Arc<dyn SearchHandler>) -> Self {
        Self {
            search,
            settings: SearchSettings::default(),
        }
    }
}

/// Configuration for the search plugin.
#[derive(Default)]
pub struct SearchConfig {
    /// Host providers, registered as `global-0`, `global-1`, ...
    pub providers: Vec<InitialSearchProvider>,
    /// Initial result items.
    pub results: Vec<Value>,
    /// Initial query.
    pub query: String,
    /// Query providers for an empty query instead of resetting.
    pub empty_trigger: bool,
    pub filter: Option<ProviderFilter>,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("providers", &self.providers.len())
            .field("results", &self.results)
            .field("query", &self.query)
            .field("empty_trigger", &self.empty_trigger)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Offers [`PiletSearchApi`] to every pilet.
///
/// On install it defines the `triggerSearch`, `resetSearch` and
/// `setSearchInput` actions and seeds the `search` state domain.
pub struct SearchPlugin {
    config: Mutex<Option<SearchConfig>>,
    engine: OnceLock<Arc<SearchEngine>>,
}

impl SearchPlugin {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            engine: OnceLock::new(),
        }
    }

    /// The engine, once the plugin is installed.
    pub fn engine(&self) -> Option<&Arc<SearchEngine>> {
        self.engine.get()
    }
}

impl Default for SearchPlugin {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl HostPlugin for SearchPlugin {
    fn name(&self) -> &str {
        "search"
    }

    fn install(&self, context: &HostContext) -> pilet_loader::Result<()> {
        // The config is only consumed once the install has gone through, so
        // a failed install can be retried.
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        if self.engine.get().is_some() {
            return Err(LoaderError::AlreadyInstalled {
                plugin: self.name().to_string(),
            });
        }
        let settings = config.get_or_insert_with(SearchConfig::default);

        let mut engine = SearchEngine::new(context.container().clone())
            .with_empty_trigger(settings.empty_trigger);
        if let Some(filter) = &settings.filter {
            engine = engine.with_filter(filter.clone());
        }
        for (i, provider) in settings.providers.iter().enumerate() {
            engine.providers().register(
                format!("global-{i}"),
                SearchProviderRegistration::new(None, provider.search.clone(), provider.settings.clone()),
            );
        }
        let engine = Arc::new(engine);

        context.actions().define_actions(search_actions(&engine))?;
        let SearchConfig { query, results, .. } = config.take().unwrap_or_default();
        context.container().dispatch(with_all([
            with_path(
                StatePath::from(["registry", "searchProviders"]),
                json!(engine.providers().keys()),
            ),
            with_path(
                StatePath::from(["search"]),
                json!({
                    "input": query,
                    "results": { "loading": false, "items": results },
                }),
            ),
            with_root_extension("pilet-search", json!("Search")),
            with_root_extension("pilet-search-input", json!("SearchInput")),
        ]));

        if self.engine.set(engine).is_err() {
            return Err(LoaderError::AlreadyInstalled {
                plugin: self.name().to_string(),
            });
        }
        Ok(())
    }

    fn extend(&self, pilet: &PiletDescriptor, _context: &HostContext, extensions: &mut Extensions) {
        if let Some(engine) = self.engine.get() {
            extensions.insert(PiletSearchApi::new(pilet.name.clone(), engine.clone()));
        }
    }

    fn on_unload(&self, pilet: &str, _context: &HostContext) {
        if let Some(engine) = self.engine.get() {
            engine.unregister_pilet(pilet);
        }
    }
}

/// Accepts either a bare query string or `{ "query": .., "immediate": .. }`.
fn query_args(args: &Value) -> (String, bool) {
    match args {
        Value::String(query) => (query.clone(), false),
        Value::Object(map) => (
            map.get("query")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            map.get("immediate").and_then(Value::as_bool).unwrap_or(false),
        ),
        _ => (String::new(), false),
    }
}

fn search_actions(engine: &Arc<SearchEngine>) -> Vec<(&'static str, ActionFn)> {
    // Searching is asynchronous, so the action only starts it.
    let trigger = {
        let engine = engine.clone();
        action(move |_, args| {
            let (query, immediate) = query_args(args);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let engine = engine.clone();
                    handle.spawn(async move {
                        engine.trigger_search(&query, immediate).await;
                    });
                }
                Err(_) => tracing::warn!(query = %query, "triggerSearch called outside a tokio runtime"),
            }
            Vec::new()
        })
    };

    let reset = {
        let engine = engine.clone();
        action(move |_, args| {
            let (query, _) = query_args(args);
            vec![engine.reset(&query)]
        })
    };

    let input = action(|_, args| {
        let (query, _) = query_args(args);
        vec![with_path(StatePath::from(["search", "input"]), json!(query))]
    });

    vec![
        ("triggerSearch", trigger),
        ("resetSearch", reset),
        ("setSearchInput", input),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_args_shapes() {
        assert_eq!(query_args(&json!("docs")), ("docs".to_string(), false));
        assert_eq!(
            query_args(&json!({"query": "docs", "immediate": true})),
            ("docs".to_string(), true)
        );
        assert_eq!(query_args(&Value::Null), (String::new(), false));
    }

    #[test]
    fn install_seeds_state_and_actions() {
        let context = HostContext::empty();
        let plugin = SearchPlugin::new(SearchConfig {
            providers: vec![
                InitialSearchProvider::new(crate::search_handler(|_| async { Ok(Vec::new()) })),
                InitialSearchProvider::new(crate::search_handler(|_| async { Ok(Vec::new()) })),
            ],
            query: "start".into(),
            ..SearchConfig::default()
        });

        plugin.install(&context).unwrap();

        let state = context.container().get_state();
        assert_eq!(
            state.get(&StatePath::from(["registry", "searchProviders"])),
            Some(&json!(["global-0", "global-1"]))
        );
        assert_eq!(state.get(&StatePath::from(["search", "input"])), Some(&json!("start")));
        let slots = state.get(&StatePath::from(["registry", "extensions"])).unwrap();
        assert_eq!(slots["pilet-search"].as_array().unwrap().len(), 1);
        assert_eq!(slots["pilet-search-input"].as_array().unwrap().len(), 1);

        for name in ["triggerSearch", "resetSearch", "setSearchInput"] {
            assert!(context.actions().has_action(name));
        }
        assert!(plugin.engine().is_some());
    }

    #[test]
    fn set_and_reset_actions() {
        let context = HostContext::empty();
        SearchPlugin::default().install(&context).unwrap();

        context
            .actions()
            .call("setSearchInput", json!("abc"))
            .unwrap();
        assert_eq!(
            context.container().read_path(&StatePath::from(["search", "input"])),
            Some(json!("abc"))
        );

        context.actions().call("resetSearch", json!("")).unwrap();
        assert_eq!(
            context.container().read_path(&StatePath::from(["search"])),
            Some(json!({"input": "", "results": {"loading": false, "items": []}}))
        );
    }

    #[test]
    fn installing_twice_is_rejected() {
        let context = HostContext::empty();
        let plugin = SearchPlugin::default();
        plugin.install(&context).unwrap();

        let other = HostContext::empty();
        let err = plugin.install(&other).unwrap_err();
        assert!(matches!(err, LoaderError::AlreadyInstalled { ref plugin } if plugin == "search"));
        assert!(!other.actions().has_action("triggerSearch"));
    }

    #[test]
    fn failed_install_keeps_config_for_retry() {
        let taken = HostContext::empty();
        taken
            .actions()
            .define_action("triggerSearch", action(|_, _| Vec::new()))
            .unwrap();
        let plugin = SearchPlugin::new(SearchConfig {
            providers: vec![InitialSearchProvider::new(crate::search_handler(|_| async {
                Ok(Vec::new())
            }))],
            query: "kept".into(),
            ..SearchConfig::default()
        });

        assert!(plugin.install(&taken).is_err());
        assert!(plugin.engine().is_none());

        let context = HostContext::empty();
        plugin.install(&context).unwrap();
        assert_eq!(
            context.container().read_path(&StatePath::from(["search", "input"])),
            Some(json!("kept"))
        );
        assert_eq!(
            context.container().read_path(&StatePath::from(["registry", "searchProviders"])),
            Some(json!(["global-0"]))
        );
    }
}
