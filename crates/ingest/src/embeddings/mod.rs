//! Embedding generation for chunks.
//!
//! Wraps an [`EmbeddingProvider`] so that each document costs exactly one
//! provider call, with the text cleaned up for the model but the chunks
//! themselves left untouched.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use crate::chunk::Chunk;
use crate::error::IngestError;

/// Text as sent to the embedding model: newlines removed.
///
/// Only the request payload is normalized; stored chunk text keeps its newlines.
pub fn normalize_for_embedding(text: &str) -> String {
    text.replace('\n', "")
}

/// Embed all chunks of one document in a single provider call.
///
/// Returns one vector per chunk, index-aligned with `chunks`. A provider
/// failure or a vector count that differs from the chunk count fails the
/// whole document.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    source_id: &str,
    chunks: &[Chunk],
) -> Result<Vec<Vec<f32>>, IngestError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = chunks
        .iter()
        .map(|chunk| normalize_for_embedding(&chunk.text))
        .collect();

    tracing::debug!(
        source_id,
        chunks = texts.len(),
        provider = provider.provider_name(),
        model = provider.model_name(),
        "Embedding document chunks"
    );

    let embeddings = provider
        .embed_batch(&texts)
        .await
        .map_err(|e| IngestError::Embedding {
            source_id: source_id.to_string(),
            reason: e.to_string(),
        })?;

    if embeddings.len() != texts.len() {
        return Err(IngestError::Embedding {
            source_id: source_id.to_string(),
            reason: format!(
                "provider returned {} embeddings for {} chunks",
                embeddings.len(),
                texts.len()
            ),
        });
    }

    Ok(embeddings)
}
