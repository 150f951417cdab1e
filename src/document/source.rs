//! Document sources: fixtures, local files and HTTP.

use super::DocumentBatch;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source unavailable ({origin}): {reason}")]
    Unavailable { origin: String, reason: String },

    #[error("Document content is empty")]
    EmptyDocument,
}

impl SourceError {
    fn unavailable(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Something that can produce the retrieved context for a question.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> String;

    /// Load the documents. Never returns an empty batch.
    async fn fetch(&self) -> Result<DocumentBatch, SourceError>;
}

/// Apply the optional top-k cap and reject empty results.
fn finish(
    origin: String,
    mut batch: DocumentBatch,
    max_documents: Option<usize>,
) -> Result<DocumentBatch, SourceError> {
    if let Some(max) = max_documents {
        batch.truncate(max);
    }
    if batch.is_empty() {
        return Err(SourceError::unavailable(origin, "no documents"));
    }
    tracing::debug!(
        origin = %origin,
        documents = batch.len(),
        chars = batch.total_chars(),
        "Fetched documents"
    );
    Ok(batch)
}

/// In-memory documents.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    texts: Vec<String>,
}

const SAMPLE_DOCUMENTS: &[&str] = &[
    "The Harbor Point lighthouse was completed in 1871 after four years of construction. \
     Its tower stands 38 metres tall and was built from granite quarried on the island itself.",
    "The original lens was a first-order Fresnel lens manufactured in Paris. It was replaced \
     by an automated LED beacon in 1994, and the Fresnel lens is now on display at the \
     maritime museum in the town of Eastwick.",
    "Keepers lived on the island with their families until automation. The last resident \
     keeper, Margaret Doyle, served for twenty-two years and logged more than three hundred \
     storms in the station journal.",
    "The island is reachable by a ferry that runs twice daily between May and September. \
     Outside the season, access requires a permit from the coastal authority.",
    "In 2011 the lighthouse was added to the national register of historic places. A \
     restoration fund has since repaired the lantern room and repainted the tower's \
     distinctive red and white bands.",
];

impl FixtureSource {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }

    /// Built-in sample context used when no source is given.
    #[must_use]
    pub fn sample() -> Self {
        Self::new(SAMPLE_DOCUMENTS.iter().copied())
    }
}

#[async_trait]
impl DocumentSource for FixtureSource {
    fn describe(&self) -> String {
        format!("fixture ({} documents)", self.texts.len())
    }

    /// Blank texts are skipped, the same way file segments are.
    async fn fetch(&self) -> Result<DocumentBatch, SourceError> {
        let texts = self.texts.iter().filter(|text| !text.trim().is_empty());
        let batch = DocumentBatch::from_texts(texts.cloned())?;
        finish(self.describe(), batch, None)
    }
}

/// UTF-8 file split into documents on blank lines.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    max_documents: Option<usize>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_documents: None,
        }
    }

    #[must_use]
    pub fn with_max_documents(mut self, max: Option<usize>) -> Self {
        self.max_documents = max;
        self
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<DocumentBatch, SourceError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::unavailable(self.describe(), e))?;
        finish(
            self.describe(),
            DocumentBatch::split_text(&text),
            self.max_documents,
        )
    }
}

/// Text fetched over HTTP(S). HTML responses are converted to plain text.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    max_documents: Option<usize>,
}

/// Wrap width for HTML-to-text conversion.
const HTML_TEXT_WIDTH: usize = 120;

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("squeeze/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: url.into(),
            max_documents: None,
        }
    }

    #[must_use]
    pub fn with_max_documents(mut self, max: Option<usize>) -> Self {
        self.max_documents = max;
        self
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<DocumentBatch, SourceError> {
        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| SourceError::unavailable(self.describe(), format!("invalid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::unavailable(
                self.describe(),
                format!("unsupported scheme: {}", url.scheme()),
            ));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(self.describe(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::unavailable(
                self.describe(),
                format!("HTTP {status}"),
            ));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("html"));

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(self.describe(), e))?;

        let text = if is_html {
            html2text::from_read(body.as_bytes(), HTML_TEXT_WIDTH)
                .map_err(|e| SourceError::unavailable(self.describe(), e))?
        } else {
            body
        };

        finish(
            self.describe(),
            DocumentBatch::split_text(&text),
            self.max_documents,
        )
    }
}
