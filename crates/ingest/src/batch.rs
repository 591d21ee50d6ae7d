//! Fixed-size batching of vector records for upsert.

use crate::error::IngestError;
use crate::progress::ProgressReporter;
use crate::types::VectorRecord;
use crate::vector_index::IndexWriter;

/// Totals reported by [`BatchAccumulator::finalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub batches_submitted: u64,
    pub records_submitted: u64,
}

/// Collects records and submits them in batches of exactly `batch_size`.
///
/// A batch is sent as soon as it is full; [`finalize`](Self::finalize) sends
/// the remaining partial batch. Records are submitted in arrival order, each
/// exactly once, and no empty batch is ever sent.
///
/// A failed submission is returned to the caller as [`IngestError::Upsert`]
/// and the records of that batch are dropped; nothing is retried.
pub struct BatchAccumulator<'a> {
    writer: &'a dyn IndexWriter,
    index_name: &'a str,
    batch_size: usize,
    buffer: Vec<VectorRecord>,
    summary: BatchSummary,
    progress: ProgressReporter,
}

impl<'a> BatchAccumulator<'a> {
    /// Create an empty accumulator writing to `index_name`.
    pub fn new(
        writer: &'a dyn IndexWriter,
        index_name: &'a str,
        batch_size: usize,
    ) -> Result<Self, IngestError> {
        if batch_size == 0 {
            return Err(IngestError::Config(
                "batch size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            writer,
            index_name,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            summary: BatchSummary::default(),
            progress: ProgressReporter::noop(),
        })
    }

    /// Report each accepted batch to `progress`.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Number of records waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Totals so far.
    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    /// Append a record, submitting the batch if it is now full.
    pub async fn add(&mut self, record: VectorRecord) -> Result<(), IngestError> {
        self.buffer.push(record);
        if self.buffer.len() == self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Submit the remaining partial batch, if any, and return the totals.
    pub async fn finalize(mut self) -> Result<BatchSummary, IngestError> {
        if !self.buffer.is_empty() {
            self.flush().await?;
        }

        tracing::debug!(
            index = self.index_name,
            batches = self.summary.batches_submitted,
            records = self.summary.records_submitted,
            "Batch accumulator finalized"
        );

        Ok(self.summary)
    }

    async fn flush(&mut self) -> Result<(), IngestError> {
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let number = self.summary.batches_submitted + 1;
        let count = batch.len();
        let first_id = batch.first().map(|r| r.id.clone()).unwrap_or_default();
        let last_id = batch.last().map(|r| r.id.clone()).unwrap_or_default();

        tracing::debug!(
            index = self.index_name,
            batch = number,
            records = count,
            first_id = %first_id,
            last_id = %last_id,
            "Submitting batch"
        );

        self.writer
            .upsert(self.index_name, batch)
            .await
            .map_err(|e| IngestError::Upsert {
                batch: number as usize,
                records: count,
                first_id,
                last_id,
                reason: e.to_string(),
            })?;

        self.summary.batches_submitted = number;
        self.summary.records_submitted += count as u64;
        self.progress.upsert(number, count, self.index_name);

        Ok(())
    }
}
