//! Error taxonomy for the ingestion and query pipeline.
//!
//! Every failure carries the failing stage and an underlying cause message.
//! Errors are surfaced to the caller as-is — nothing in the core retries or
//! collapses a failure into an empty result.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by ingestion, retrieval, and answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The document path does not exist.
    #[error("document not found: {}", .path.display())]
    DocumentNotFound {
        /// Path that was requested for ingestion.
        path: PathBuf,
    },

    /// The document exists but could not be read or parsed.
    #[error("unreadable document {}: {message}", .path.display())]
    UnreadableDocument {
        /// Path that failed to load.
        path: PathBuf,
        /// Cause reported by the reader or extractor.
        message: String,
    },

    /// The embedding capability failed for a chunk batch or a query.
    #[error("embedding failed ({provider}): {message}")]
    EmbeddingFailed {
        /// Embedding provider that produced the error.
        provider: String,
        /// Cause reported by the provider.
        message: String,
    },

    /// An inserted vector's length disagrees with the index dimensionality.
    #[error("dimension mismatch: index holds {expected}-dim vectors, got {actual}")]
    DimensionMismatch {
        /// Dimensionality established by the first inserted record.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The persisted index could not be opened, read, or written.
    #[error("vector index unavailable: {message}")]
    IndexUnavailable {
        /// Cause reported by the storage layer.
        message: String,
    },

    /// The generative capability failed.
    #[error("generation failed ({provider}): {message}")]
    GenerationFailed {
        /// Generation provider that produced the error.
        provider: String,
        /// Cause reported by the provider.
        message: String,
    },

    /// The configuration file is missing a value or holds an invalid one.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for RagError {
    fn from(e: sqlx::Error) -> Self {
        RagError::IndexUnavailable {
            message: e.to_string(),
        }
    }
}

/// Convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
