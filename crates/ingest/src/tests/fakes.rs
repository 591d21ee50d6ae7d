//! In-memory stand-ins for the embedding provider and the index.

use crate::embeddings::EmbeddingProvider;
use crate::types::VectorRecord;
use crate::vector_index::IndexWriter;
use docvec_core::{AppError, AppResult};
use std::sync::Mutex;

/// Embedder whose answers are driven by markers in the input text.
#[derive(Debug, Default)]
pub struct ScriptedEmbedder {
    pub dimensions: usize,
    /// Fail any call containing a text with this substring
    pub fail_marker: Option<String>,
    /// Return vectors of this length for texts containing the marker
    pub wrong_length: Option<(String, usize)>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn wrong_length_on(mut self, marker: &str, len: usize) -> Self {
        self.wrong_length = Some((marker.to_string(), len));
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.to_vec());

        if let Some(marker) = &self.fail_marker {
            if texts.iter().any(|t| t.contains(marker.as_str())) {
                return Err(AppError::Embedding("rate limited".to_string()));
            }
        }

        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let len = match &self.wrong_length {
                    Some((marker, len)) if text.contains(marker.as_str()) => *len,
                    _ => self.dimensions,
                };
                vec![i as f32 + 1.0; len]
            })
            .collect())
    }
}

/// Index writer that keeps every accepted batch.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub batches: Mutex<Vec<(String, Vec<VectorRecord>)>>,
    pub fail_on_batch: Option<usize>,
}

impl RecordingWriter {
    pub fn failing_on_batch(batch: usize) -> Self {
        Self {
            fail_on_batch: Some(batch),
            ..Default::default()
        }
    }

    pub fn batch_ids(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, records)| records.iter().map(|r| r.id.clone()).collect())
            .collect()
    }

    pub fn records(&self) -> Vec<VectorRecord> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, records)| records.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl IndexWriter for RecordingWriter {
    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> AppResult<()> {
        let mut batches = self.batches.lock().unwrap();
        if self.fail_on_batch == Some(batches.len() + 1) {
            return Err(AppError::Index("connection reset".to_string()));
        }
        batches.push((index_name.to_string(), records));
        Ok(())
    }
}
