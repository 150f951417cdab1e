//! Baseline vs compressed evaluation.
//!
//! The harness fetches the context once, answers the question with the
//! uncompressed context and again with the compressed context, and reports
//! what each call cost. Branch failures end up in the report instead of
//! aborting the run.

mod harness;
mod render;
mod report;


pub use harness::EvaluationHarness;
pub use render::render_text;
pub use report::{
    AnswerComparison, Branch, BranchError, CompressionSummary, EvaluationReport, RunOutcome,
    RunRecord, Savings, SavingsMetric, UndefinedReason, compute_savings,
};

use crate::Error;
use crate::prompt::{DEFAULT_TEMPLATE, PromptTemplate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Target ratio for the compressed branch.
    pub ratio: f64,
    /// Prompt template with `{context}` and `{question}`.
    pub template: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Force temperature 0 on both branches.
    pub deterministic: bool,
    pub metric: SavingsMetric,
    /// Run both branches concurrently.
    pub parallel: bool,
    /// Retries for transient inference failures. 0 disables retrying.
    pub max_retries: u32,
}

impl HarnessSettings {
    /// Reject settings no provider would accept. The ratio is left to the
    /// compression strategy so a bad ratio shows up on the compressed branch.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature {} is outside [0, 2]",
                self.temperature
            )));
        }
        PromptTemplate::parse(self.template.as_str())?;
        Ok(())
    }

    #[must_use]
    pub fn effective_temperature(&self) -> f32 {
        if self.deterministic {
            0.0
        } else {
            self.temperature
        }
    }
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            ratio: 0.5,
            template: DEFAULT_TEMPLATE.to_string(),
            max_tokens: 256,
            temperature: 0.7,
            deterministic: false,
            metric: SavingsMetric::Cost,
            parallel: false,
            max_retries: 0,
        }
    }
}
