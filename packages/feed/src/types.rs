use std::collections::HashMap;

use serde::de::DeserializeOwned;

/// A GET request against a feed or pilet asset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,

    /// Query parameters
    pub query: HashMap<String, String>,

    /// Request headers
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: &HashMap<String, String>) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }
}

/// HTTP response from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Raw response body
    pub body_text: String,
}

impl HttpResponse {
    pub fn ok(body_text: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body_text: body_text.into(),
        }
    }

    pub fn with_status(status: u16, body_text: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body_text: body_text.into(),
        }
    }

    pub fn status_code(&self) -> Option<http::StatusCode> {
        http::StatusCode::from_u16(self.status).ok()
    }

    /// 2xx. Codes outside the valid range never count as success.
    pub fn is_success(&self) -> bool {
        self.status_code().is_some_and(|code| code.is_success())
    }

    /// Try to deserialize the body into a specific type
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body_text)
    }
}
