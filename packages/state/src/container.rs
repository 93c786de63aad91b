//! The state container.
//!
//! The container owns the current [`GlobalState`] as an immutable snapshot.
//! Every dispatch folds its updates over the current snapshot, publishes the
//! result as a new snapshot, and only then notifies subscribers, so a
//! subscriber never sees the intermediate value between two updates that
//! were dispatched together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use serde_json::Value;

use crate::path::StatePath;
use crate::state::GlobalState;
use crate::update::Update;

type Listener = Arc<dyn Fn(&GlobalState) + Send + Sync>;
type Listeners = Mutex<Vec<(u64, Listener)>>;

/// Owner of the single global state tree.
pub struct StateContainer {
    current: RwLock<Arc<GlobalState>>,
    listeners: Arc<Listeners>,
    next_listener: AtomicU64,
    revision: AtomicU64,
}

impl StateContainer {
    pub fn new(initial: GlobalState) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
            revision: AtomicU64::new(0),
        }
    }

    /// A snapshot of the current state.
    pub fn get_state(&self) -> Arc<GlobalState> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a selector against the current state.
    ///
    /// The selector only ever sees a shared reference, so there is no way to
    /// write through it.
    pub fn read_state<T>(&self, selector: impl FnOnce(&GlobalState) -> T) -> T {
        let snapshot = self.get_state();
        selector(&snapshot)
    }

    /// Clone the value at a path out of the current state.
    pub fn read_path(&self, path: &StatePath) -> Option<Value> {
        self.read_state(|state| state.get(path).cloned())
    }

    /// Number of transitions applied so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Apply a single update and notify subscribers.
    pub fn dispatch(&self, update: impl Into<Update>) -> Arc<GlobalState> {
        self.dispatch_all([update.into()])
    }

    /// Apply several updates, in order, as one transition.
    ///
    /// Subscribers are notified exactly once with the fully composed state.
    pub fn dispatch_all(&self, updates: impl IntoIterator<Item = Update>) -> Arc<GlobalState> {
        let next = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let next = updates
                .into_iter()
                .fold(GlobalState::clone(&current), |state, update| {
                    update.apply(state)
                });
            let next = Arc::new(next);
            *current = next.clone();
            self.revision.fetch_add(1, Ordering::SeqCst);
            next
        };

        self.notify(&next);
        next
    }

    /// Register a callback invoked after every transition.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&GlobalState) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self, state: &GlobalState) {
        // Listeners run without the lock held so they may subscribe,
        // unsubscribe, or dispatch.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(state);
        }
    }
}

impl Default for StateContainer {
    fn default() -> Self {
        Self::new(GlobalState::default())
    }
}

impl std::fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContainer")
            .field("revision", &self.revision())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`StateContainer::subscribe`].
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to stop receiving notifications.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Stop receiving notifications. Calling this twice is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}
