//! Client for a hosted compression service.

use super::{CompressionError, CompressionRequest, CompressionResult, CompressionStrategy};
use crate::config::CompressionConfig;
use crate::document::{Document, DocumentBatch};
use crate::http::{AuthConfig, HttpClient, HttpError};
use crate::provider::extract_error_message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const COMPRESS_PATH: &str = "/compress";

#[derive(Debug, Serialize)]
struct CompressBody<'a> {
    documents: Vec<&'a str>,
    ratio: f64,
}

#[derive(Debug, Deserialize)]
struct CompressResponse {
    documents: Vec<String>,
    #[serde(default)]
    achieved_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Forwards compression requests to a remote service.
#[derive(Debug)]
pub struct RemoteCompressionStrategy {
    http: HttpClient,
}

impl RemoteCompressionStrategy {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    #[must_use]
    pub fn from_config(config: &CompressionConfig) -> Self {
        let auth = AuthConfig::from_key(config.resolved_api_key());
        Self::new(HttpClient::new(&config.base_url, auth, config.timeout()))
    }

    fn service_error(status: reqwest::StatusCode, body: &str) -> CompressionError {
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
            return CompressionError::Service {
                code: envelope
                    .error
                    .code
                    .unwrap_or_else(|| format!("http_{}", status.as_u16())),
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| status.to_string()),
            };
        }
        let message = extract_error_message(body).unwrap_or_else(|| body.trim().to_string());
        CompressionError::Service {
            code: format!("http_{}", status.as_u16()),
            message: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        }
    }
}

impl From<HttpError> for CompressionError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(after) => Self::Timeout(after),
            other => Self::Service {
                code: "transport".to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl CompressionStrategy for RemoteCompressionStrategy {
    fn name(&self) -> &str {
        "remote"
    }

    async fn compress(
        &self,
        request: &CompressionRequest,
    ) -> Result<CompressionResult, CompressionError> {
        let ratio = request.ratio()?;
        let body = CompressBody {
            documents: request.batch.contents(),
            ratio: ratio.get(),
        };

        tracing::debug!(
            service = %self.http.base_url(),
            documents = body.documents.len(),
            chars = request.batch.total_chars(),
            ratio = ratio.get(),
            "Compression request"
        );

        let response = self.http.post_json(COMPRESS_PATH, &body).await?;
        if !response.is_success() {
            return Err(Self::service_error(response.status, &response.body));
        }

        // Some services report failures in a 200 body.
        if let Ok(envelope) = response.json::<ErrorEnvelope>() {
            return Err(CompressionError::Service {
                code: envelope.error.code.unwrap_or_else(|| "unknown".to_string()),
                message: envelope.error.message.unwrap_or_default(),
            });
        }

        let parsed: CompressResponse = response.json().map_err(|e| CompressionError::Service {
            code: "invalid_response".to_string(),
            message: format!("Failed to parse response: {e}"),
        })?;

        let batch: DocumentBatch = parsed
            .documents
            .into_iter()
            .filter_map(|text| Document::new(text).ok())
            .collect();
        if batch.is_empty() {
            return Err(CompressionError::Service {
                code: "empty_result".to_string(),
                message: "service returned no documents".to_string(),
            });
        }

        let measured = CompressionResult::measured(&request.batch, batch);
        let achieved_ratio = parsed.achieved_ratio.unwrap_or(measured.achieved_ratio);
        if achieved_ratio > ratio.get() {
            tracing::debug!(
                target_ratio = ratio.get(),
                achieved_ratio,
                "Compression overshot target"
            );
        }

        Ok(CompressionResult {
            batch: measured.batch,
            achieved_ratio,
        })
    }
}
