//! Error types for debug sessions.

use thiserror::Error;

/// Errors raised by the live-reload channel and debug endpoint discovery.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The pilet API address could not be parsed.
    #[error("invalid pilet api address: {0}")]
    Url(#[from] url::ParseError),

    /// The pilet API address cannot be turned into a socket address.
    #[error("no socket scheme for {scheme} urls")]
    UnsupportedScheme { scheme: String },

    /// The socket handshake failed.
    #[error("live reload connection failed: {0}")]
    Connect(String),
}

/// Result type alias for debug operations.
pub type Result<T> = std::result::Result<T, ReloadError>;
