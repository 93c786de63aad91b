//! # pilet-state
//!
//! The shared, mutable application state of a pilet host.
//!
//! - [`GlobalState`]: one tree keyed by domain (`registry`, `modules`,
//!   `search`, feature namespaces), read by everyone
//! - [`Update`]: a pure function from one state to the next
//! - [`StateContainer`]: owns the current state, applies updates, notifies
//!   subscribers once per dispatch
//! - [`ActionDispatcher`]: named operations deriving updates, the only write
//!   path handed to pilets
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pilet_state::{action, state_path, with_path, ActionDispatcher, StateContainer};
//! use serde_json::json;
//!
//! let container = Arc::new(StateContainer::default());
//! let actions = ActionDispatcher::new(container.clone());
//!
//! actions
//!     .define_action(
//!         "setSearchInput",
//!         action(|_, args| vec![with_path(state_path!("search/input"), args.clone())]),
//!     )
//!     .unwrap();
//!
//! actions.call("setSearchInput", json!("docs")).unwrap();
//! assert_eq!(container.read_path(&state_path!("search/input")), Some(json!("docs")));
//! ```

mod actions;
mod container;
mod error;
mod path;
mod state;
mod update;

pub use actions::{action, Action, ActionDispatcher, ActionFn};
pub use container::{StateContainer, Subscription};
pub use error::{ActionError, Result, StateError};
pub use path::{PathError, StatePath};
pub use state::GlobalState;
pub use update::{
    map_path, with_all, with_domain, with_path, with_root_extension, without_path, Update,
};

// Re-export the value type the state tree is built from.
pub use serde_json::Value;
