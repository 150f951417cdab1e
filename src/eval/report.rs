use crate::compression::CompressionError;
use crate::provider::{self, UsageMetrics};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Which side of the comparison a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Baseline,
    Compressed,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => f.write_str("baseline"),
            Self::Compressed => f.write_str("compressed"),
        }
    }
}

/// Quantity the savings figure is computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SavingsMetric {
    /// Monetary cost of the inference call.
    #[default]
    Cost,
    PromptTokens,
    TotalTokens,
    /// Wall time of the branch, compression included.
    Latency,
}

impl SavingsMetric {
    #[must_use]
    pub fn measure(self, record: &RunRecord) -> f64 {
        match self {
            Self::Cost => record.usage.cost_usd,
            Self::PromptTokens => f64::from(record.usage.prompt_tokens),
            Self::TotalTokens => f64::from(record.usage.total_tokens),
            Self::Latency => record.latency_ms as f64,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Cost => "cost",
            Self::PromptTokens => "prompt tokens",
            Self::TotalTokens => "total tokens",
            Self::Latency => "latency",
        }
    }
}

/// Size of the context that went into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionSummary {
    pub documents: usize,
    pub input_chars: usize,
    pub output_chars: usize,
    pub achieved_ratio: f64,
}

/// A branch that made it all the way through inference.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub strategy: String,
    pub answer: String,
    pub usage: UsageMetrics,
    pub latency_ms: u64,
    pub compression: CompressionSummary,
    /// The answer hit `max_tokens`.
    pub truncated: bool,
}

/// Why a branch stopped.
#[derive(Debug, Error)]
pub enum BranchError {
    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Inference(#[from] provider::Error),
}

impl BranchError {
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Compression(_) => "compression",
            Self::Inference(_) => "inference",
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Compression(e) => e.code(),
            Self::Inference(e) => e.code(),
        }
    }
}

impl Serialize for BranchError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BranchError", 3)?;
        state.serialize_field("stage", self.stage())?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RunRecord),
    Failed(BranchError),
}

impl RunOutcome {
    #[must_use]
    pub fn record(&self) -> Option<&RunRecord> {
        match self {
            Self::Completed(record) => Some(record),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&BranchError> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    ZeroBaseline,
    MissingRun,
    /// A measurement was NaN or infinite.
    NonFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBaseline => f.write_str("baseline is zero"),
            Self::MissingRun => f.write_str("a run failed"),
            Self::NonFinite => f.write_str("measurement is not a finite number"),
        }
    }
}

/// Relative reduction from baseline to compressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Savings {
    Defined { fraction: f64 },
    Undefined { reason: UndefinedReason },
}

impl Savings {
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Defined { fraction } => Some(*fraction),
            Self::Undefined { .. } => None,
        }
    }

    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }
}

/// `(baseline - compressed) / baseline`, undefined for a zero baseline or a
/// non-finite measurement.
///
/// Negative when compression made things worse.
#[must_use]
pub fn compute_savings(baseline: f64, compressed: f64) -> Savings {
    if !baseline.is_finite() || !compressed.is_finite() {
        return Savings::Undefined {
            reason: UndefinedReason::NonFinite,
        };
    }
    if baseline == 0.0 {
        return Savings::Undefined {
            reason: UndefinedReason::ZeroBaseline,
        };
    }
    Savings::Defined {
        fraction: (baseline - compressed) / baseline,
    }
}

/// How close the two answers are.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnswerComparison {
    pub exact_match: bool,
    /// Word-level diff ratio in [0, 1].
    pub similarity: f64,
}

impl AnswerComparison {
    #[must_use]
    pub fn compare(baseline: &str, compressed: &str) -> Self {
        let (a, b) = (baseline.trim(), compressed.trim());
        Self {
            exact_match: a == b,
            similarity: f64::from(similar::TextDiff::from_words(a, b).ratio()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub question: String,
    pub model: String,
    pub documents: usize,
    pub target_ratio: f64,
    pub metric: SavingsMetric,
    pub baseline: RunOutcome,
    pub compressed: RunOutcome,
    pub savings: Savings,
    pub comparison: Option<AnswerComparison>,
}

impl EvaluationReport {
    #[must_use]
    pub fn new(
        question: impl Into<String>,
        model: impl Into<String>,
        documents: usize,
        target_ratio: f64,
        metric: SavingsMetric,
        baseline: RunOutcome,
        compressed: RunOutcome,
    ) -> Self {
        let (savings, comparison) = match (baseline.record(), compressed.record()) {
            (Some(b), Some(c)) => (
                compute_savings(metric.measure(b), metric.measure(c)),
                Some(AnswerComparison::compare(&b.answer, &c.answer)),
            ),
            _ => (
                Savings::Undefined {
                    reason: UndefinedReason::MissingRun,
                },
                None,
            ),
        };

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            question: question.into(),
            model: model.into(),
            documents,
            target_ratio,
            metric,
            baseline,
            compressed,
            savings,
            comparison,
        }
    }

    /// Both branches completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.baseline.record().is_some() && self.compressed.record().is_some()
    }

    #[must_use]
    pub fn outcome(&self, branch: Branch) -> &RunOutcome {
        match branch {
            Branch::Baseline => &self.baseline,
            Branch::Compressed => &self.compressed,
        }
    }
}
