//! Context compression strategies.
//!
//! A strategy maps a batch of documents and a target ratio to a (usually)
//! smaller batch. [`IdentityStrategy`] is the uncompressed baseline;
//! [`RemoteCompressionStrategy`] forwards to a hosted compression service.

mod remote;

pub use remote::RemoteCompressionStrategy;

use crate::document::DocumentBatch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Invalid compression ratio {0}: must be in (0, 1]")]
    InvalidRatio(f64),

    #[error("Compression service error ({code}): {message}")]
    Service { code: String, message: String },

    #[error("Compression timed out after {0:?}")]
    Timeout(Duration),
}

impl CompressionError {
    /// Machine-readable code, stable across messages.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidRatio(_) => "invalid_ratio",
            Self::Service { code, .. } => code,
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Target output size as a fraction of input size, in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Ratio(f64);

impl Ratio {
    /// No compression.
    pub const FULL: Self = Self(1.0);

    pub fn new(value: f64) -> Result<Self, CompressionError> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(CompressionError::InvalidRatio(value))
        }
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Ratio {
    type Error = CompressionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ratio> for f64 {
    fn from(ratio: Ratio) -> Self {
        ratio.0
    }
}

/// Documents plus the requested ratio.
///
/// The ratio is kept raw so each strategy decides whether it cares; the
/// remote strategy validates it before touching the network.
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub batch: DocumentBatch,
    pub target_ratio: f64,
}

impl CompressionRequest {
    #[must_use]
    pub fn new(batch: DocumentBatch, target_ratio: f64) -> Self {
        Self {
            batch,
            target_ratio,
        }
    }

    pub fn ratio(&self) -> Result<Ratio, CompressionError> {
        Ratio::new(self.target_ratio)
    }
}

/// Compressed documents and the ratio actually achieved.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub batch: DocumentBatch,
    pub achieved_ratio: f64,
}

impl CompressionResult {
    /// Character ratio of `output` against `input`. An empty input counts as 1.0.
    #[must_use]
    pub fn measured(input: &DocumentBatch, output: DocumentBatch) -> Self {
        let input_chars = input.total_chars();
        let achieved_ratio = if input_chars == 0 {
            1.0
        } else {
            output.total_chars() as f64 / input_chars as f64
        };
        Self {
            batch: output,
            achieved_ratio,
        }
    }
}

#[async_trait]
pub trait CompressionStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn compress(
        &self,
        request: &CompressionRequest,
    ) -> Result<CompressionResult, CompressionError>;
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityStrategy;

#[async_trait]
impl CompressionStrategy for IdentityStrategy {
    fn name(&self) -> &str {
        "identity"
    }

    async fn compress(
        &self,
        request: &CompressionRequest,
    ) -> Result<CompressionResult, CompressionError> {
        Ok(CompressionResult {
            batch: request.batch.clone(),
            achieved_ratio: 1.0,
        })
    }
}
