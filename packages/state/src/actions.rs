//! Named actions: the sanctioned write path into the state container.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::container::StateContainer;
use crate::error::ActionError;
use crate::state::GlobalState;
use crate::update::Update;

/// An action implementation.
///
/// Receives read access to the current state and the caller's arguments and
/// derives zero or more updates. Derivation must be synchronous: any I/O an
/// action needs happens before or after it is called.
pub type ActionFn = Arc<dyn Fn(&GlobalState, &Value) -> Vec<Update> + Send + Sync>;

/// Wrap a closure as an [`ActionFn`].
pub fn action<F>(f: F) -> ActionFn
where
    F: Fn(&GlobalState, &Value) -> Vec<Update> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Binds action names to state container mutations.
///
/// Definitions are additive: a name can be defined once for the lifetime of
/// the dispatcher, so a plugin can never silently replace a host action.
pub struct ActionDispatcher {
    container: Arc<StateContainer>,
    actions: RwLock<BTreeMap<String, ActionFn>>,
}

impl ActionDispatcher {
    pub fn new(container: Arc<StateContainer>) -> Self {
        Self {
            container,
            actions: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn container(&self) -> &Arc<StateContainer> {
        &self.container
    }

    /// Define a batch of actions.
    ///
    /// The batch is all-or-nothing: if any name is already defined, or
    /// appears twice in the batch, nothing is added.
    pub fn define_actions<I, S>(&self, actions: I) -> Result<(), ActionError>
    where
        I: IntoIterator<Item = (S, ActionFn)>,
        S: Into<String>,
    {
        let batch: Vec<(String, ActionFn)> =
            actions.into_iter().map(|(n, f)| (n.into(), f)).collect();

        let mut defined = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        let mut seen = std::collections::BTreeSet::new();
        for (name, _) in &batch {
            if defined.contains_key(name) || !seen.insert(name.as_str()) {
                return Err(ActionError::DuplicateAction { name: name.clone() });
            }
        }

        for (name, f) in batch {
            tracing::debug!(action = %name, "defined action");
            defined.insert(name, f);
        }
        Ok(())
    }

    pub fn define_action(&self, name: impl Into<String>, f: ActionFn) -> Result<(), ActionError> {
        self.define_actions([(name.into(), f)])
    }

    /// Resolve an action by name.
    pub fn get_action(&self, name: &str) -> Result<Action, ActionError> {
        let f = self
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ActionError::UnknownAction {
                name: name.to_string(),
            })?;

        Ok(Action {
            name: name.to_string(),
            f,
            container: self.container.clone(),
        })
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Look up and invoke an action in one step.
    pub fn call(&self, name: &str, args: Value) -> Result<(), ActionError> {
        self.get_action(name)?.call(args);
        Ok(())
    }
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("actions", &self.names())
            .finish()
    }
}

/// A resolved action bound to its container.
#[derive(Clone)]
pub struct Action {
    name: String,
    f: ActionFn,
    container: Arc<StateContainer>,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derive this action's updates and dispatch them as one transition.
    ///
    /// Returns the number of updates applied. An action that derives no
    /// updates does not notify subscribers.
    pub fn call(&self, args: Value) -> usize {
        let updates = self.container.read_state(|state| (self.f)(state, &args));
        let count = updates.len();
        if count > 0 {
            self.container.dispatch_all(updates);
        }
        count
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}
