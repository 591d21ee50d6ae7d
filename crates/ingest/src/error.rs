//! Error types for the ingest pipeline.

use docvec_core::AppError;
use thiserror::Error;

/// Errors raised while turning documents into upserted vectors.
///
/// Every variant names the document, chunk or batch it concerns so a failed
/// run can be traced back to its input.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The splitter was misconfigured or broke its size bound.
    #[error("failed to split '{source_id}': {reason}")]
    Split { source_id: String, reason: String },

    /// The embedding provider failed or returned the wrong number of vectors.
    #[error("failed to embed '{source_id}': {reason}")]
    Embedding { source_id: String, reason: String },

    /// An embedding does not match the configured index dimension.
    #[error(
        "embedding for '{source_id}' chunk {chunk_index} has dimension {actual}, index expects {expected}"
    )]
    DimensionMismatch {
        source_id: String,
        chunk_index: usize,
        expected: usize,
        actual: usize,
    },

    /// The index rejected a batch; its records were not written.
    #[error("upsert of batch {batch} ({records} records, {first_id}..{last_id}) failed: {reason}")]
    Upsert {
        batch: usize,
        records: usize,
        first_id: String,
        last_id: String,
        reason: String,
    },

    /// A record could not be assembled from its parts.
    #[error("invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    /// The pipeline configuration is unusable.
    #[error("invalid pipeline configuration: {0}")]
    Config(String),
}

impl IngestError {
    /// Whether the failure only concerns a single document.
    ///
    /// Only these are subject to the per-document skip policy; everything
    /// else aborts the run.
    pub fn is_document_scoped(&self) -> bool {
        matches!(self, IngestError::Split { .. } | IngestError::Embedding { .. })
    }

    /// Records that were handed to the index writer but not written.
    pub fn dropped_records(&self) -> usize {
        match self {
            IngestError::Upsert { records, .. } => *records,
            _ => 0,
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Config(msg) => AppError::Config(msg),
            other => AppError::Ingest(other.to_string()),
        }
    }
}
