//! Language-model inference.
//!
//! [`InferenceClient`] is the seam the harness talks to; it returns the answer
//! together with [`UsageMetrics`] for the call. [`OpenAiCompatClient`] is the
//! real implementation for any OpenAI-compatible chat completions endpoint.
//!
//! # Example
//!
//! ```ignore
//! use squeeze::provider::{InferenceClient, OpenAiCompatClient};
//!
//! let client = OpenAiCompatClient::from_config(&config.inference)?;
//! let completion = client.complete(&prompt, 256, 0.0).await?;
//! println!("{} (${:.5})", completion.answer, completion.usage.cost_usd);
//! ```

mod budget;
mod client;
mod error;
mod openai_compat;
mod retry;
mod types;

pub use budget::{BudgetGuard, Reservation};
pub use client::InferenceClient;
pub use error::{Error, extract_error_message, format_api_error};
pub use openai_compat::OpenAiCompatClient;
pub use retry::backoff_delay;
pub use types::{Completion, ModelPricing, UsageMetrics};
