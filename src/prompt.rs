//! Prompt assembly from retrieved context and a question.

use crate::document::DocumentBatch;
use thiserror::Error;

/// Separator placed between documents in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub const CONTEXT_PLACEHOLDER: &str = "{context}";
pub const QUESTION_PLACEHOLDER: &str = "{question}";

pub const DEFAULT_TEMPLATE: &str = "{context}\n\nQuestion: {question}\nAnswer:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),
}

/// A template known to contain both placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn parse(template: impl Into<String>) -> Result<Self, TemplateError> {
        let source = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !source.contains(placeholder) {
                return Err(TemplateError::MissingPlaceholder(placeholder));
            }
        }
        Ok(Self { source })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute in one left-to-right pass. Inserted text is never
    /// rescanned, so braces inside documents or the question stay literal.
    #[must_use]
    pub fn render(&self, batch: &DocumentBatch, question: &str) -> String {
        let context = batch.joined(CONTEXT_SEPARATOR);
        let mut out = String::with_capacity(self.source.len() + context.len() + question.len());
        let mut rest = self.source.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
                out.push_str(&context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Join `batch`, then fill `template` with the context and `question`.
pub fn assemble(
    batch: &DocumentBatch,
    question: &str,
    template: &str,
) -> Result<String, TemplateError> {
    Ok(PromptTemplate::parse(template)?.render(batch, question))
}
