//! Error types for plume-memory

use thiserror::Error;

/// Result type alias for plume-memory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in plume-memory
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: topic length, unknown enum value, inconsistent
    /// series order. Reported before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Continuation was requested for a series that has no posts.
    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    /// The underlying vector store query failed.
    #[error("Similarity search error: {0}")]
    SimilaritySearch(String),

    /// The generation backend failed or timed out.
    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    /// Fact extraction failed or timed out. Aborts the whole aggregation,
    /// never yields a partial fact set.
    #[error("Fact extraction error: {0}")]
    FactExtraction(String),

    /// Insert failed after a successful generation. The generated body
    /// exists but was not recorded, so callers must be able to tell this
    /// apart from a generation failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn series_not_found(msg: impl Into<String>) -> Self {
        Self::SeriesNotFound(msg.into())
    }

    pub fn search(msg: impl Into<String>) -> Self {
        Self::SimilaritySearch(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::GenerationBackend(msg.into())
    }

    pub fn fact_extraction(msg: impl Into<String>) -> Self {
        Self::FactExtraction(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
