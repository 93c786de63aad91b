//! Error types for pilet loading.

use pilet_feed::FeedError;
use pilet_state::ActionError;
use thiserror::Error;

/// Boxed error returned by pilet code (setup, disposers, evaluators).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while loading or unloading pilets.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The descriptor carries neither inline content nor a link.
    #[error("pilet {name} has no content and no link")]
    MissingSource { name: String },

    /// No statically known module matches the pilet.
    #[error("no module registered for pilet {name}")]
    ModuleNotFound { name: String },

    /// Fetching the pilet's code failed.
    #[error("failed to fetch pilet {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: FeedError,
    },

    /// The HTTP client used to fetch pilet code could not be built.
    #[error("http client error: {0}")]
    Client(String),

    /// The pilet's code could not be turned into a module.
    #[error("failed to evaluate pilet {name}: {message}")]
    Evaluate { name: String, message: String },

    /// The pilet's setup returned an error or panicked.
    #[error("setup of pilet {name} failed: {message}")]
    Setup { name: String, message: String },

    /// A host plugin could not be installed.
    #[error("plugin {plugin} failed to install: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: ActionError,
    },

    /// The plugin keeps per-host state and was already installed.
    #[error("plugin {plugin} is already installed")]
    AlreadyInstalled { plugin: String },

    /// An action could not be defined or resolved.
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = LoaderError::MissingSource { name: "a".into() };
        assert_eq!(err.to_string(), "pilet a has no content and no link");

        let err = LoaderError::Fetch {
            name: "a".into(),
            source: FeedError::Status {
                url: "https://cdn/a.js".into(),
                status: 404,
            },
        };
        assert!(err.to_string().starts_with("failed to fetch pilet a"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn action_errors_convert() {
        let err: LoaderError = ActionError::UnknownAction { name: "x".into() }.into();
        assert_eq!(err.to_string(), "unknown action: x");
    }
}
