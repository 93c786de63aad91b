use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("feed request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feed returned {found}, expected a pilet or a list of pilets")]
    InvalidFeed { found: &'static str },
}

pub type Result<T> = std::result::Result<T, FeedError>;
