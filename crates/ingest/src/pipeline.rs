//! Pipeline driver: documents in, upserted vector records out.
//!
//! Each document is split, embedded with a single provider call, checked
//! against the index dimension, assembled into records and handed to a
//! [`BatchAccumulator`] that spans the whole run.

use std::sync::Arc;
use std::time::Instant;

use docvec_core::config::DocumentErrorPolicy;
use docvec_core::AppConfig;
use tracing::Instrument;

use crate::batch::BatchAccumulator;
use crate::chunk::split_document;
use crate::embeddings::{embed_chunks, EmbeddingProvider};
use crate::error::IngestError;
use crate::progress::ProgressReporter;
use crate::record::assemble;
use crate::types::{Document, IngestStats};
use crate::vector_index::IndexWriter;

/// Settings the driver needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Maximum chunk size in characters
    pub chunk_max_size: usize,

    /// Records per upsert request
    pub batch_size: usize,

    /// Expected embedding length
    pub dimension: usize,

    /// What to do when a document fails to split or embed
    pub on_document_error: DocumentErrorPolicy,

    /// Target index
    pub index_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_max_size: 1000,
            batch_size: 100,
            dimension: 1536,
            on_document_error: DocumentErrorPolicy::Abort,
            index_name: "docvec".to_string(),
        }
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            chunk_max_size: config.pipeline.chunk_max_size,
            batch_size: config.pipeline.batch_size,
            dimension: config.pipeline.dimension,
            on_document_error: config.pipeline.on_document_error,
            index_name: config.index.name.clone(),
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_max_size == 0 {
            return Err(IngestError::Config(
                "chunk max size must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(IngestError::Config(
                "batch size must be greater than 0".to_string(),
            ));
        }
        if self.dimension == 0 {
            return Err(IngestError::Config(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if self.index_name.trim().is_empty() {
            return Err(IngestError::Config("index name is required".to_string()));
        }
        Ok(())
    }
}

/// Sequential ingest driver.
pub struct Pipeline {
    config: PipelineConfig,
    provider: Arc<dyn EmbeddingProvider>,
    writer: Arc<dyn IndexWriter>,
    progress: ProgressReporter,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_name())
            .finish()
    }
}

impl Pipeline {
    /// Build a driver, rejecting configurations that cannot produce valid records.
    pub fn new(
        config: PipelineConfig,
        provider: Arc<dyn EmbeddingProvider>,
        writer: Arc<dyn IndexWriter>,
    ) -> Result<Self, IngestError> {
        config.validate()?;

        if provider.dimensions() != config.dimension {
            return Err(IngestError::Config(format!(
                "embedding model '{}' produces {} dimensions but the index expects {}",
                provider.model_name(),
                provider.dimensions(),
                config.dimension
            )));
        }

        Ok(Self {
            config,
            provider,
            writer,
            progress: ProgressReporter::noop(),
        })
    }

    /// Attach a progress reporter.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest `documents` in order.
    ///
    /// Records reach the index in document order and, within a document, in
    /// chunk order. Batches are not flushed between documents; the final
    /// partial batch is submitted once all documents are done.
    ///
    /// When the run aborts, records still waiting in the current partial
    /// batch are not submitted. Batches already accepted stay in the index.
    pub async fn run(&self, documents: &[Document]) -> Result<IngestStats, IngestError> {
        let start = Instant::now();
        let total = documents.len() as u64;
        let mut stats = IngestStats::default();

        tracing::info!(
            documents = documents.len(),
            index = %self.config.index_name,
            batch_size = self.config.batch_size,
            chunk_max_size = self.config.chunk_max_size,
            "Starting ingest run"
        );

        let mut batches = BatchAccumulator::new(
            self.writer.as_ref(),
            &self.config.index_name,
            self.config.batch_size,
        )?
        .with_progress(self.progress.clone());

        for (position, document) in documents.iter().enumerate() {
            let current = position as u64 + 1;
            let span = tracing::info_span!("document", source_id = %document.source_id, current);

            let outcome = self
                .process_document(document, &mut batches, current, total)
                .instrument(span)
                .await;

            match outcome {
                Ok(0) => {
                    tracing::debug!(source_id = %document.source_id, "Document produced no chunks");
                    stats.documents_skipped_empty += 1;
                }
                Ok(chunks) => {
                    stats.documents_processed += 1;
                    stats.chunks_created += chunks as u64;
                }
                Err(e)
                    if e.is_document_scoped()
                        && self.config.on_document_error == DocumentErrorPolicy::Skip =>
                {
                    tracing::warn!(source_id = %document.source_id, "Skipping document: {}", e);
                    stats.failed_documents.push(document.source_id.clone());
                }
                Err(e) => {
                    tracing::error!(
                        source_id = %document.source_id,
                        discarded = batches.pending() + e.dropped_records(),
                        "Ingest run aborted: {}",
                        e
                    );
                    return Err(e);
                }
            }
        }

        let summary = batches.finalize().await.inspect_err(|e| {
            tracing::error!(discarded = e.dropped_records(), "Final batch failed: {}", e);
        })?;

        stats.batches_submitted = summary.batches_submitted;
        stats.records_upserted = summary.records_submitted;
        stats.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            documents = stats.documents_processed,
            empty = stats.documents_skipped_empty,
            failed = stats.failed_documents.len(),
            chunks = stats.chunks_created,
            records = stats.records_upserted,
            batches = stats.batches_submitted,
            duration_secs = stats.duration_secs,
            "Ingest run complete"
        );

        Ok(stats)
    }

    /// Run one document through split, embed, check and assemble.
    ///
    /// Nothing is added to `batches` until every chunk of the document has a
    /// valid embedding, so a failing document contributes no records.
    /// Returns the number of chunks added.
    async fn process_document(
        &self,
        document: &Document,
        batches: &mut BatchAccumulator<'_>,
        current: u64,
        total: u64,
    ) -> Result<usize, IngestError> {
        let chunks = split_document(document, self.config.chunk_max_size)?;
        self.progress
            .split(current, Some(total), &document.source_id, chunks.len());

        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = embed_chunks(self.provider.as_ref(), &document.source_id, &chunks).await?;
        self.progress.embed(
            current,
            Some(total),
            &document.source_id,
            self.provider.model_name(),
        );

        if let Some((chunk_index, embedding)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != self.config.dimension)
        {
            return Err(IngestError::DimensionMismatch {
                source_id: document.source_id.clone(),
                chunk_index,
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        let count = chunks.len();
        for (chunk_index, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            let record = assemble(&document.source_id, chunk, chunk_index, embedding)?;
            batches.add(record).await?;
        }

        tracing::debug!(chunks = count, pending = batches.pending(), "Document queued");
        Ok(count)
    }
}
