//! HTTP execution abstraction.
//!
//! Feed and asset fetches go through [`HttpExecutor`] so they can be mocked
//! in tests without network calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::types::{HttpRequest, HttpResponse};

/// Performs GET requests for feeds and pilet assets.
///
/// `Err` carries a message when no response was received at all. A non-2xx
/// status is still an `Ok` response here; callers decide what it means.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

#[async_trait]
impl<T: HttpExecutor + ?Sized> HttpExecutor for std::sync::Arc<T> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        (**self).execute(request).await
    }
}

/// [`HttpExecutor`] backed by a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map(|client| Self { client })
            .map_err(|e| e.to_string())
    }

    /// 30 second timeout.
    pub fn with_default_timeout() -> Result<Self, String> {
        Self::new(Duration::from_secs(30))
    }
}

fn header_map(request: &HttpRequest) -> Result<HeaderMap, String> {
    request
        .headers
        .iter()
        .map(|(name, value)| {
            let name = HeaderName::try_from(name.as_str()).map_err(|e| e.to_string())?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| e.to_string())?;
            Ok((name, value))
        })
        .collect()
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = self.client.get(&request.url).headers(header_map(request)?);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body_text = response.text().await.map_err(|e| e.to_string())?;

        tracing::trace!(url = %request.url, status, "fetched");
        Ok(HttpResponse {
            status,
            headers,
            body_text,
        })
    }
}

/// Canned responses for tests, keyed by URL.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Script {
        routes: HashMap<String, HttpResponse>,
        outage: Option<String>,
        requests: Vec<HttpRequest>,
    }

    /// Answers from a route table and records every request.
    ///
    /// Clones share the same table, so a test can keep one handle for
    /// assertions after moving another into the code under test. Unknown
    /// URLs get a 404.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        script: Arc<Mutex<Script>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
            self.script.lock().unwrap().routes.insert(url.into(), response);
            self
        }

        /// Serve `body` as a 200 JSON response.
        pub fn with_json(self, url: impl Into<String>, body: serde_json::Value) -> Self {
            self.with_response(url, HttpResponse::ok(body.to_string()))
        }

        /// Every request fails as if the network were down.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            self.script.lock().unwrap().outage = Some(message.into());
            self
        }

        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.script.lock().unwrap().requests.clone()
        }
    }

    #[async_trait]
    impl HttpExecutor for MockExecutor {
        async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request.clone());
            if let Some(message) = &script.outage {
                return Err(message.clone());
            }
            Ok(script
                .routes
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| HttpResponse::with_status(404, "")))
        }
    }
}
