//! Error types for the state layer.

use thiserror::Error;

use crate::path::PathError;

/// Errors raised while building or addressing state values.
#[derive(Debug, Error)]
pub enum StateError {
    /// The global state must be a JSON object keyed by domain.
    #[error("global state must be an object, found {found}")]
    NotAnObject { found: &'static str },

    /// A state path was invalid.
    #[error("path error: {0}")]
    Path(#[from] PathError),
}

/// Errors raised by the action dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// An action with this name is already defined.
    #[error("action already defined: {name}")]
    DuplicateAction { name: String },

    /// No action with this name is defined.
    #[error("unknown action: {name}")]
    UnknownAction { name: String },
}

/// Result type alias for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
