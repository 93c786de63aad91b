//! The capability object handed to each pilet.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use pilet_feed::PiletDescriptor;
use pilet_state::{
    Action, ActionDispatcher, ActionError, GlobalState, StateContainer, Subscription, Value,
};

/// The session's shared state and actions, as seen by host plugins.
#[derive(Debug, Clone)]
pub struct HostContext {
    container: Arc<StateContainer>,
    actions: Arc<ActionDispatcher>,
}

impl HostContext {
    pub fn new(actions: Arc<ActionDispatcher>) -> Self {
        Self {
            container: actions.container().clone(),
            actions,
        }
    }

    /// A fresh container and dispatcher with an empty state.
    pub fn empty() -> Self {
        Self::new(Arc::new(ActionDispatcher::new(Arc::new(
            StateContainer::default(),
        ))))
    }

    pub fn container(&self) -> &Arc<StateContainer> {
        &self.container
    }

    pub fn actions(&self) -> &Arc<ActionDispatcher> {
        &self.actions
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::empty()
    }
}

/// Typed capability extensions contributed by host plugins.
///
/// Holds at most one value per type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an extension, returning `true` if one of the same type was
    /// replaced.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> bool {
        self.map.insert(TypeId::of::<T>(), Box::new(value)).is_some()
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

struct ApiInner {
    meta: PiletDescriptor,
    context: HostContext,
    extensions: Extensions,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Capabilities bound to one pilet and this session.
///
/// Cheap to clone; pilets may keep a clone inside their handlers.
#[derive(Clone)]
pub struct PiletApi {
    inner: Arc<ApiInner>,
}

impl PiletApi {
    pub fn new(meta: PiletDescriptor, context: HostContext, extensions: Extensions) -> Self {
        Self {
            inner: Arc::new(ApiInner {
                meta,
                context,
                extensions,
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The descriptor this pilet was loaded from.
    pub fn meta(&self) -> &PiletDescriptor {
        &self.inner.meta
    }

    pub fn name(&self) -> &str {
        &self.inner.meta.name
    }

    pub fn context(&self) -> &HostContext {
        &self.inner.context
    }

    pub fn get_action(&self, name: &str) -> Result<Action, ActionError> {
        self.inner.context.actions.get_action(name)
    }

    pub fn call_action(&self, name: &str, args: Value) -> Result<(), ActionError> {
        self.inner.context.actions.call(name, args)
    }

    pub fn get_state(&self) -> Arc<GlobalState> {
        self.inner.context.container.get_state()
    }

    pub fn read_state<T>(&self, selector: impl FnOnce(&GlobalState) -> T) -> T {
        self.inner.context.container.read_state(selector)
    }

    /// Subscribe to state changes for as long as the pilet is loaded.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&GlobalState) + Send + Sync + 'static,
    {
        let subscription = self.inner.context.container.subscribe(listener);
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscription.clone());
        subscription
    }

    /// The capability extension of type `T`, if a plugin contributed one.
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.extensions.get::<T>()
    }

    /// Drop every subscription made through this object.
    pub(crate) fn release_subscriptions(&self) {
        let subscriptions = std::mem::take(
            &mut *self
                .inner
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }
}

impl fmt::Debug for PiletApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiletApi")
            .field("pilet", &self.inner.meta.name)
            .field("extensions", &self.inner.extensions)
            .finish()
    }
}
