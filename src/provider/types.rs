//! Shared types for inference calls.

use serde::{Deserialize, Serialize};

/// Token counts and cost for one inference call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
}

impl UsageMetrics {
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32, cost_usd: f64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            cost_usd,
        }
    }
}

/// Pricing per million tokens, in USD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

impl ModelPricing {
    #[must_use]
    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (f64::from(prompt_tokens) * self.input + f64::from(completion_tokens) * self.output)
            / 1_000_000.0
    }
}

/// Answer text plus what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub answer: String,
    pub usage: UsageMetrics,
    /// The answer stopped at the `max_tokens` limit.
    pub truncated: bool,
}
