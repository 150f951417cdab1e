//! Inference error types.

use super::retry::is_transient_status;
use crate::http::HttpError;
use std::time::Duration;
use thiserror::Error;

/// Format an API error for display, extracting the message from JSON if present.
///
/// `"HTTP 429: {"error": {"message": "Rate limit"}}"` becomes
/// `"HTTP 429: Rate limit"`. Plain text is returned as-is.
#[must_use]
pub fn format_api_error(error: &str) -> String {
    if let Some(json_start) = error.find('{')
        && let Some(msg) = extract_error_message(&error[json_start..])
    {
        let prefix = error[..json_start].trim();
        if prefix.is_empty() {
            return msg;
        }
        return format!("{prefix} {msg}");
    }
    error.to_string()
}

/// Pull a readable message out of a JSON error body.
///
/// Understands `{"error": {"message", "code"|"status"}}`, `{"error": "..."}`
/// and `{"message": "..."}`.
#[must_use]
pub fn extract_error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(error_obj) = json.get("error") {
        if let Some(msg) = error_obj.get("message").and_then(|v| v.as_str()) {
            let detail = error_obj
                .get("code")
                .and_then(|v| v.as_str())
                .map(|code| format!(" (code: {code})"))
                .or_else(|| {
                    error_obj
                        .get("status")
                        .and_then(|v| v.as_str())
                        .map(|status| format!(" (status: {status})"))
                })
                .unwrap_or_default();
            return Some(format!("{msg}{detail}"));
        }
        if let Some(msg) = error_obj.as_str() {
            return Some(msg.to_string());
        }
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing API key for {service}. Set one of: {}", env_vars.join(", "))]
    MissingApiKey {
        service: String,
        env_vars: Vec<String>,
    },

    /// Non-success HTTP status other than 429.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never got an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but could not be used.
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("Budget exceeded: spent ${spent:.5} + estimated ${estimate:.5} > ceiling ${ceiling:.5}")]
    BudgetExceeded {
        spent: f64,
        estimate: f64,
        ceiling: f64,
    },

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Machine-readable code for reports.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey { .. } => "missing_api_key",
            Self::Api { .. } => "api_error",
            Self::Transport(_) => "transport",
            Self::Inference(_) => "inference_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Whether a caller may retry this failure with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Transport(_) => true,
            Self::Api { status, .. } => is_transient_status(*status),
            Self::MissingApiKey { .. } | Self::Inference(_) | Self::BudgetExceeded { .. } => false,
        }
    }
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(after) => Self::Timeout(after),
            HttpError::Transport(err) => Self::Transport(err.to_string()),
            HttpError::InvalidHeader(reason) => Self::Inference(format!("Invalid header: {reason}")),
        }
    }
}
