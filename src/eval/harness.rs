use super::HarnessSettings;
use super::report::{Branch, BranchError, CompressionSummary, EvaluationReport, RunOutcome, RunRecord};
use crate::compression::{CompressionRequest, CompressionStrategy, IdentityStrategy, Ratio};
use crate::document::{DocumentBatch, DocumentSource};
use crate::error::Result;
use crate::prompt::PromptTemplate;
use crate::provider::{self, Completion, InferenceClient, backoff_delay};
use std::sync::Arc;
use std::time::Instant;

/// Runs one question through the baseline and compressed paths.
pub struct EvaluationHarness {
    source: Arc<dyn DocumentSource>,
    baseline: Arc<dyn CompressionStrategy>,
    compressor: Arc<dyn CompressionStrategy>,
    inference: Arc<dyn InferenceClient>,
    settings: HarnessSettings,
}

impl EvaluationHarness {
    /// The baseline branch uses [`IdentityStrategy`] unless replaced with
    /// [`with_baseline`](Self::with_baseline).
    pub fn new(
        source: Arc<dyn DocumentSource>,
        compressor: Arc<dyn CompressionStrategy>,
        inference: Arc<dyn InferenceClient>,
        settings: HarnessSettings,
    ) -> Self {
        Self {
            source,
            baseline: Arc::new(IdentityStrategy),
            compressor,
            inference,
            settings,
        }
    }

    #[must_use]
    pub fn with_baseline(mut self, strategy: Arc<dyn CompressionStrategy>) -> Self {
        self.baseline = strategy;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Evaluate `question`.
    ///
    /// Source and template errors abort. Compression and inference errors
    /// are recorded on their branch and the report is still returned.
    pub async fn run(&self, question: &str) -> Result<EvaluationReport> {
        let batch = self.source.fetch().await?;
        let template = PromptTemplate::parse(self.settings.template.as_str())?;

        tracing::info!(
            source = %self.source.describe(),
            documents = batch.len(),
            chars = batch.total_chars(),
            ratio = self.settings.ratio,
            parallel = self.settings.parallel,
            "Starting evaluation"
        );

        let (baseline, compressed) = if self.settings.parallel {
            tokio::join!(
                self.run_branch(Branch::Baseline, &batch, &template, question),
                self.run_branch(Branch::Compressed, &batch, &template, question),
            )
        } else {
            let baseline = self
                .run_branch(Branch::Baseline, &batch, &template, question)
                .await;
            let compressed = self
                .run_branch(Branch::Compressed, &batch, &template, question)
                .await;
            (baseline, compressed)
        };

        let report = EvaluationReport::new(
            question,
            self.inference.id(),
            batch.len(),
            self.settings.ratio,
            self.settings.metric,
            baseline,
            compressed,
        );

        tracing::info!(
            run_id = %report.run_id,
            complete = report.is_complete(),
            savings = ?report.savings,
            "Evaluation finished"
        );
        Ok(report)
    }

    async fn run_branch(
        &self,
        branch: Branch,
        batch: &DocumentBatch,
        template: &PromptTemplate,
        question: &str,
    ) -> RunOutcome {
        match self.try_branch(branch, batch, template, question).await {
            Ok(record) => RunOutcome::Completed(record),
            Err(err) => {
                tracing::warn!(
                    branch = %branch,
                    stage = err.stage(),
                    code = err.code(),
                    error = %err,
                    "Branch failed"
                );
                RunOutcome::Failed(err)
            }
        }
    }

    async fn try_branch(
        &self,
        branch: Branch,
        batch: &DocumentBatch,
        template: &PromptTemplate,
        question: &str,
    ) -> std::result::Result<RunRecord, BranchError> {
        let (strategy, ratio) = match branch {
            Branch::Baseline => (&self.baseline, Ratio::FULL.get()),
            Branch::Compressed => (&self.compressor, self.settings.ratio),
        };

        let started = Instant::now();
        let request = CompressionRequest::new(batch.clone(), ratio);
        let compressed = strategy.compress(&request).await?;
        let compression = CompressionSummary {
            documents: compressed.batch.len(),
            input_chars: batch.total_chars(),
            output_chars: compressed.batch.total_chars(),
            achieved_ratio: compressed.achieved_ratio,
        };

        let prompt = template.render(&compressed.batch, question);
        let completion = self.complete_with_retry(branch, &prompt).await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(
            branch = %branch,
            strategy = strategy.name(),
            achieved_ratio = compression.achieved_ratio,
            prompt_tokens = completion.usage.prompt_tokens,
            cost_usd = completion.usage.cost_usd,
            latency_ms,
            "Branch complete"
        );

        Ok(RunRecord {
            strategy: strategy.name().to_string(),
            answer: completion.answer,
            usage: completion.usage,
            latency_ms,
            compression,
            truncated: completion.truncated,
        })
    }

    async fn complete_with_retry(
        &self,
        branch: Branch,
        prompt: &str,
    ) -> std::result::Result<Completion, provider::Error> {
        let temperature = self.settings.effective_temperature();
        let mut attempt = 0;
        loop {
            match self
                .inference
                .complete(prompt, self.settings.max_tokens, temperature)
                .await
            {
                Ok(completion) => return Ok(completion),
                Err(err) if attempt < self.settings.max_retries && err.is_retryable() => {
                    let retry_after = match &err {
                        provider::Error::RateLimited { retry_after } => *retry_after,
                        _ => None,
                    };
                    let delay = backoff_delay(attempt, retry_after);
                    tracing::warn!(
                        branch = %branch,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying inference"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
