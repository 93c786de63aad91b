use thiserror::Error;
use tokio::task::JoinError;

/// Errors produced by search providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The provider rejected the query.
    #[error("search provider failed: {0}")]
    Failed(String),

    /// The provider's task was aborted before producing a result.
    #[error("search provider aborted")]
    Aborted,
}

impl From<JoinError> for SearchError {
    fn from(e: JoinError) -> Self {
        if e.is_cancelled() {
            Self::Aborted
        } else {
            Self::Failed(format!("search provider panicked: {e}"))
        }
    }
}

impl From<&str> for SearchError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_string())
    }
}

impl From<String> for SearchError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
