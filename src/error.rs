use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EtdbError {
    #[error("catalog request failed: {0}")]
    Catalog(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("remote stream failed: {0}")]
    Stream(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid file category: {0}")]
    InvalidCategory(String),

    #[error("invalid thread count: {0}")]
    InvalidThreads(String),
}
