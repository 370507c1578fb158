use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Catalog load error ({}): {message}", path.display())]
    CatalogLoad { path: PathBuf, message: String },

    #[error("Ingest error on host {host}: {message}")]
    Ingest { host: String, message: String },

    #[error("Encode error: {0}")]
    Encode(String),
}

impl SummarizerError {
    pub fn catalog(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SummarizerError::CatalogLoad { path: path.into(), message: message.into() }
    }

    pub fn ingest(host: impl Into<String>, message: impl Into<String>) -> Self {
        SummarizerError::Ingest { host: host.into(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, SummarizerError>;
