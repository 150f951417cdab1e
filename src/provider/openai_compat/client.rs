//! OpenAI-compatible API client.

use super::request::{ChatMessage, ChatRequest};
use super::response::ChatResponse;
use crate::config::InferenceConfig;
use crate::http::{AuthConfig, HttpClient};
use crate::provider::budget::BudgetGuard;
use crate::provider::client::InferenceClient;
use crate::provider::error::{Error, format_api_error};
use crate::provider::types::{Completion, ModelPricing, UsageMetrics};
use crate::tokens::TokenCounter;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Non-streaming chat completions against any OpenAI-compatible endpoint.
pub struct OpenAiCompatClient {
    http: HttpClient,
    model: String,
    pricing: ModelPricing,
    budget: Option<Arc<BudgetGuard>>,
    counter: TokenCounter,
}

impl OpenAiCompatClient {
    pub fn new(http: HttpClient, model: impl Into<String>, pricing: ModelPricing) -> Self {
        Self {
            http,
            model: model.into(),
            pricing,
            budget: None,
            counter: TokenCounter::new(),
        }
    }

    /// Build a client from configuration, resolving the API key from the
    /// environment when the config leaves it out.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, Error> {
        let api_key = config.resolved_api_key();
        if api_key.is_none() && !config.is_local() {
            return Err(Error::MissingApiKey {
                service: config.base_url.clone(),
                env_vars: InferenceConfig::API_KEY_ENV_VARS
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect(),
            });
        }

        let http = HttpClient::new(
            &config.base_url,
            AuthConfig::from_key(api_key),
            config.timeout(),
        );
        let client = Self::new(http, &config.model, config.pricing);
        Ok(match config.budget_usd {
            Some(ceiling) => client.with_budget(Arc::new(BudgetGuard::new(ceiling))),
            None => client,
        })
    }

    #[must_use]
    pub fn with_budget(mut self, guard: Arc<BudgetGuard>) -> Self {
        self.budget = Some(guard);
        self
    }

    #[must_use]
    pub fn budget(&self) -> Option<&BudgetGuard> {
        self.budget.as_deref()
    }

    fn build_request(&self, prompt: &str, max_tokens: u32, temperature: f32) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
            stream: false,
        }
    }

    /// Worst-case cost: full prompt plus every allowed completion token.
    fn estimate_cost(&self, prompt: &str, max_tokens: u32) -> f64 {
        let prompt_tokens = u32::try_from(self.counter.count_str(prompt)).unwrap_or(u32::MAX);
        self.pricing.cost(prompt_tokens, max_tokens)
    }

    fn convert_response(&self, response: ChatResponse, prompt: &str) -> Result<Completion, Error> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Inference("response contained no choices".to_string()))?;
        let answer = choice.message.content.unwrap_or_default().trim().to_string();
        let truncated = choice.finish_reason.as_deref() == Some("length");
        if truncated {
            tracing::warn!(model = %self.model, "Answer cut off at max_tokens");
        }

        let usage = match response.usage {
            Some(usage) => {
                let cost = usage.cost.unwrap_or_else(|| {
                    self.pricing
                        .cost(usage.prompt_tokens, usage.completion_tokens)
                });
                let mut metrics =
                    UsageMetrics::new(usage.prompt_tokens, usage.completion_tokens, cost);
                if usage.total_tokens > 0 {
                    metrics.total_tokens = usage.total_tokens;
                }
                metrics
            }
            None => {
                let prompt_tokens =
                    u32::try_from(self.counter.count_str(prompt)).unwrap_or(u32::MAX);
                let completion_tokens =
                    u32::try_from(self.counter.count_str(&answer)).unwrap_or(u32::MAX);
                tracing::warn!(
                    model = %self.model,
                    prompt_tokens,
                    completion_tokens,
                    "Response has no usage; using local token estimate"
                );
                UsageMetrics::new(
                    prompt_tokens,
                    completion_tokens,
                    self.pricing.cost(prompt_tokens, completion_tokens),
                )
            }
        };

        Ok(Completion {
            answer,
            usage,
            truncated,
        })
    }
}

#[async_trait]
impl InferenceClient for OpenAiCompatClient {
    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, Error> {
        let reservation = match self.budget.as_deref() {
            Some(budget) => Some(budget.reserve(self.estimate_cost(prompt, max_tokens))?),
            None => None,
        };

        let request = self.build_request(prompt, max_tokens, temperature);
        tracing::debug!(
            model = %request.model,
            prompt_chars = prompt.len(),
            max_tokens,
            temperature,
            "Inference request"
        );

        let response = self.http.post_json(COMPLETIONS_PATH, &request).await?;
        if response.status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after: response.retry_after,
            });
        }
        if !response.is_success() {
            let message = format_api_error(response.body.trim());
            return Err(Error::Api {
                status: response.status.as_u16(),
                message: if message.is_empty() {
                    response
                        .status
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string()
                } else {
                    message
                },
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| Error::Inference(format!("Failed to parse response: {e}")))?;
        let completion = self.convert_response(parsed, prompt)?;

        if let Some(reservation) = reservation {
            reservation.settle(completion.usage.cost_usd);
        }

        tracing::debug!(
            model = %self.model,
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            cost_usd = completion.usage.cost_usd,
            "Inference complete"
        );
        Ok(completion)
    }
}

#[cfg(test)]
impl OpenAiCompatClient {
    pub(crate) fn build_request_for_test(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> ChatRequest {
        self.build_request(prompt, max_tokens, temperature)
    }
}
