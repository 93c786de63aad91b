use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or running an [`Instance`](crate::Instance).
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Feed(#[from] pilet_feed::FeedError),

    #[error(transparent)]
    Loader(#[from] pilet_loader::LoaderError),

    #[error(transparent)]
    Reload(#[from] pilet_debug::ReloadError),

    /// Live reload needs a debug configuration.
    #[error("live reload requires a debug configuration")]
    DebugDisabled,
}

pub type Result<T> = std::result::Result<T, Error>;
