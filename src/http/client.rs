//! HTTP client wrapper for JSON service calls.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;

/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authentication configuration.
#[derive(Clone)]
pub enum AuthConfig {
    /// No credentials (local or open endpoints).
    None,
    /// Bearer token authentication (Authorization: Bearer {token}).
    Bearer(String),
}

impl AuthConfig {
    /// Bearer auth when a key is present, otherwise no auth.
    #[must_use]
    pub fn from_key(key: Option<String>) -> Self {
        match key {
            Some(key) if !key.is_empty() => Self::Bearer(key),
            _ => Self::None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A fully-read response. Status handling is left to the caller since each
/// service reports failures differently.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub retry_after: Option<u64>,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<R: DeserializeOwned>(&self) -> Result<R, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP client bound to one service base URL.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth: AuthConfig,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client. `timeout` is the deadline for a whole call.
    pub fn new(base_url: impl Into<String>, auth: AuthConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            timeout,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build headers including authentication.
    fn build_headers(&self) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let AuthConfig::Bearer(token) = &self.auth {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| HttpError::InvalidHeader("bearer token contains invalid characters"))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// POST a JSON body and read the whole response within the deadline.
    pub async fn post_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<HttpResponse, HttpError> {
        let url = format!("{}{path}", self.base_url);
        let headers = self.build_headers()?;

        let call = async {
            let response = self
                .client
                .post(&url)
                .headers(headers)
                .json(body)
                .send()
                .await?;
            let status = response.status();
            let retry_after = parse_retry_after(&response);
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(HttpResponse {
                status,
                retry_after,
                body,
            })
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(HttpError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(HttpError::Transport(e)),
            Err(_) => Err(HttpError::Timeout(self.timeout)),
        }
    }
}

/// Extract and parse `Retry-After` header from a response.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    let value = response.headers().get(RETRY_AFTER)?;
    parse_retry_after_value(value.to_str().ok()?)
}

/// Parse a `Retry-After` header value as seconds.
///
/// Fractional seconds round up. HTTP-date values are ignored.
fn parse_retry_after_value(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        Some(secs.max(1))
    } else if let Ok(f) = s.parse::<f64>() {
        (f.is_finite() && f > 0.0).then(|| (f.ceil() as u64).max(1))
    } else {
        None
    }
}
