use super::error::Error;
use super::types::Completion;
use async_trait::async_trait;

/// A remote language model that answers one prompt at a time.
///
/// Usage is returned with every answer; implementations keep no hidden
/// accounting state beyond an optional budget guard.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Identifier used in logs (usually the model name).
    fn id(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, Error>;
}
