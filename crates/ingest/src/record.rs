//! Vector record assembly.

use crate::chunk::Chunk;
use crate::error::IngestError;
use crate::types::VectorRecord;
use serde_json::Value;

/// Metadata key holding the document's source id.
pub const SOURCE_ID_KEY: &str = "source_id";

/// Metadata key holding the serialized chunk locator.
pub const LOCATOR_KEY: &str = "loc";

/// Metadata key holding the original chunk text.
pub const TEXT_KEY: &str = "text";

/// Deterministic record id: `{source_id}_{chunk_index}`.
pub fn record_id(source_id: &str, chunk_index: usize) -> String {
    format!("{}_{}", source_id, chunk_index)
}

/// Build the vector record for one chunk.
///
/// The chunk's metadata is copied through, then `source_id`, `loc` and
/// `text` are written on top of it. `text` is the original chunk text, not
/// the normalized form sent to the embedding model.
pub fn assemble(
    source_id: &str,
    chunk: &Chunk,
    chunk_index: usize,
    embedding: Vec<f32>,
) -> Result<VectorRecord, IngestError> {
    let id = record_id(source_id, chunk_index);

    if embedding.is_empty() {
        return Err(IngestError::InvalidRecord {
            id,
            reason: "embedding is empty".to_string(),
        });
    }

    let locator = chunk
        .locator
        .to_json_string()
        .map_err(|e| IngestError::InvalidRecord {
            id: id.clone(),
            reason: format!("failed to serialize locator: {}", e),
        })?;

    let mut metadata = chunk.metadata.clone();
    metadata.insert(SOURCE_ID_KEY.to_string(), Value::from(source_id));
    metadata.insert(LOCATOR_KEY.to_string(), Value::from(locator));
    metadata.insert(TEXT_KEY.to_string(), Value::from(chunk.text.as_str()));

    Ok(VectorRecord {
        id,
        values: embedding,
        metadata,
    })
}
