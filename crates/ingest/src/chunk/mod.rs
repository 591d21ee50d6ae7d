//! Document chunking.
//!
//! This module splits document text into bounded-size chunks that:
//! - Prefer paragraph, then line, sentence and word boundaries
//! - Never exceed the configured character limit
//! - Carry a locator (line and byte range) back into the source text
//! - Carry metadata inherited from their document

mod metadata;
mod splitter;

pub use metadata::calculate_hash;
pub use splitter::split;

use crate::error::IngestError;
use crate::types::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inclusive, 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub from: usize,
    pub to: usize,
}

/// Where a chunk came from inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Lines spanned by the chunk
    pub lines: LineRange,

    /// Byte range of the chunk in the document content
    pub byte_range: (usize, usize),
}

impl Locator {
    /// Serialize to the string form stored in index metadata.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the string form back.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A bounded slice of one document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, exactly as it appears in the document (minus surrounding whitespace)
    pub text: String,

    /// Position in the source document
    pub locator: Locator,

    /// Extra metadata carried through to the vector record
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Chunk {
    /// Create a chunk with its derived metadata (character count and content hash).
    pub fn new(text: String, locator: Locator) -> Self {
        let mut metadata = Map::new();
        metadata.insert("char_count".to_string(), Value::from(text.chars().count()));
        metadata.insert("hash".to_string(), Value::from(calculate_hash(&text)));

        Self {
            text,
            locator,
            metadata,
        }
    }
}

/// Split a document and attach its metadata to every chunk.
///
/// Chunk-derived fields win over document fields with the same key.
pub fn split_document(
    document: &Document,
    max_chunk_size: usize,
) -> Result<Vec<Chunk>, IngestError> {
    let mut chunks = split(&document.source_id, &document.content, max_chunk_size)?;

    if !document.metadata.is_empty() {
        for chunk in &mut chunks {
            let mut merged = document.metadata.clone();
            merged.append(&mut chunk.metadata);
            chunk.metadata = merged;
        }
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_round_trip() {
        let locator = Locator {
            lines: LineRange { from: 3, to: 7 },
            byte_range: (120, 480),
        };

        let s = locator.to_json_string().unwrap();
        assert_eq!(Locator::from_json_str(&s).unwrap(), locator);
    }

    #[test]
    fn test_chunk_new_metadata() {
        let locator = Locator {
            lines: LineRange { from: 1, to: 1 },
            byte_range: (0, 5),
        };
        let chunk = Chunk::new("héllo".to_string(), locator);

        assert_eq!(chunk.metadata["char_count"], 5);
        assert_eq!(chunk.metadata["hash"], calculate_hash("héllo").as_str());
    }

    #[test]
    fn test_split_document_merges_metadata() {
        let document = Document::new("notes/a.txt", "Some text.")
            .with_metadata("file_name", "a.txt")
            .with_metadata("char_count", "document value loses");

        let chunks = split_document(&document, 100).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata["file_name"], "a.txt");
        assert_eq!(chunks[0].metadata["char_count"], 10);
    }
}
