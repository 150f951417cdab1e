use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] crate::document::SourceError),

    #[error(transparent)]
    Template(#[from] crate::prompt::TemplateError),

    #[error(transparent)]
    Compression(#[from] crate::compression::CompressionError),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::Error),

    #[error("Render error: {0}")]
    Render(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
