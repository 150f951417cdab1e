//! Retrieved documents and the sources that supply them.

mod source;

pub use source::{DocumentSource, FileSource, FixtureSource, HttpSource, SourceError};

use serde::Serialize;

/// Delimiter between documents in raw source text.
pub const SEGMENT_DELIMITER: &str = "\n\n";

/// One unit of retrieved text. Content is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document {
    content: String,
}

impl Document {
    /// Create a document. Fails if the content is empty or only whitespace.
    pub fn new(content: impl Into<String>) -> Result<Self, SourceError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(SourceError::EmptyDocument);
        }
        Ok(Self { content })
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Ordered documents. Order decides concatenation order in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DocumentBatch {
    documents: Vec<Document>,
}

impl DocumentBatch {
    #[must_use]
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Build a batch from raw texts, rejecting any empty one.
    pub fn from_texts<I, S>(texts: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents = texts
            .into_iter()
            .map(Document::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { documents })
    }

    /// Split raw text into documents on blank lines.
    ///
    /// Segments are trimmed and empty segments dropped.
    #[must_use]
    pub fn split_text(text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n");
        let documents = normalized
            .split(SEGMENT_DELIMITER)
            .filter_map(|segment| Document::new(segment.trim()).ok())
            .collect();
        Self { documents }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    #[must_use]
    pub fn contents(&self) -> Vec<&str> {
        self.documents.iter().map(Document::content).collect()
    }

    /// Total characters across all documents, separators excluded.
    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.documents.iter().map(Document::char_count).sum()
    }

    /// Concatenate document contents in order.
    #[must_use]
    pub fn joined(&self, separator: &str) -> String {
        self.contents().join(separator)
    }

    /// Keep only the first `n` documents.
    pub fn truncate(&mut self, n: usize) {
        self.documents.truncate(n);
    }
}

impl IntoIterator for DocumentBatch {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl FromIterator<Document> for DocumentBatch {
    fn from_iter<T: IntoIterator<Item = Document>>(iter: T) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}
