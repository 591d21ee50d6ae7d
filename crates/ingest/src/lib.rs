//! Document ingestion into vector indexes.
//!
//! Splits documents into chunks, embeds each document's chunks in one
//! provider call, turns them into vector records and upserts them in
//! fixed-size batches.

pub mod batch;
pub mod chunk;
pub mod embeddings;
pub mod error;
pub mod loader;
pub mod pinecone_index;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod sqlite_index;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use batch::{BatchAccumulator, BatchSummary};
pub use chunk::{split, split_document, Chunk, LineRange, Locator};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use error::IngestError;
pub use loader::{load_documents, LoadOptions};
pub use pinecone_index::PineconeIndex;
pub use pipeline::{Pipeline, PipelineConfig};
pub use progress::{ProgressCallback, ProgressEvent, ProgressReporter};
pub use record::{assemble, record_id};
pub use sqlite_index::SqliteIndex;
pub use types::{Document, IngestStats, VectorRecord};
pub use vector_index::{ensure_index, EnsureOutcome, IndexManager, IndexWriter};
