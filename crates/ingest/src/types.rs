//! Ingest type definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A source document to be chunked, embedded and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque identifier (usually the file path); must be unique per run
    pub source_id: String,

    /// Raw text content
    pub content: String,

    /// Document-level metadata copied onto every chunk
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Create a document without extra metadata.
    pub fn new(source_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            content: content.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A vector with id and metadata, in the shape vector indexes accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// `{source_id}_{chunk_index}`
    pub id: String,

    /// Embedding values
    pub values: Vec<f32>,

    /// Chunk metadata plus `source_id`, `loc` and `text`
    pub metadata: Map<String, Value>,
}

/// Statistics from an ingest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Documents whose records all reached the accumulator
    pub documents_processed: u32,

    /// Documents that produced no chunks
    pub documents_skipped_empty: u32,

    /// Source ids of documents skipped after a failure
    pub failed_documents: Vec<String>,

    /// Chunks produced by the splitter across successful documents
    pub chunks_created: u64,

    /// Records accepted by the index
    pub records_upserted: u64,

    /// Upsert requests sent
    pub batches_submitted: u64,

    /// Wall-clock duration in seconds
    pub duration_secs: f64,
}
