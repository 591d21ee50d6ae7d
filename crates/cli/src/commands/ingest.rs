//! Ingest command handler.
//!
//! Loads documents from disk, ensures the index exists and runs them through
//! the pipeline.

use super::{bootstrap_index, open_index, outcome_label};
use clap::Args;
use docvec_core::config::{AppConfig, DocumentErrorPolicy};
use docvec_core::{AppError, AppResult};
use docvec_ingest::{
    create_provider, load_documents, LoadOptions, Pipeline, PipelineConfig, ProgressReporter,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Ingest documents into the vector index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest (default: workspace)
    #[arg(long)]
    pub path: Vec<PathBuf>,

    /// Include patterns (path substring)
    #[arg(long)]
    pub include: Vec<String>,

    /// Exclude patterns (path substring)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Target index name (overrides config)
    #[arg(long)]
    pub index: Option<String>,

    /// Skip documents that fail to split or embed instead of aborting
    #[arg(long)]
    pub skip_failed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    /// Effective configuration for this run.
    fn resolve_config(&self, config: &AppConfig) -> AppResult<AppConfig> {
        let mut config = config.clone();
        if let Some(index) = &self.index {
            config.index.name = index.clone();
        }
        if self.skip_failed {
            config.pipeline.on_document_error = DocumentErrorPolicy::Skip;
        }
        config.validate()?;
        Ok(config)
    }

    fn load_options(&self, config: &AppConfig) -> LoadOptions {
        let paths = if self.path.is_empty() {
            vec![config.workspace.clone()]
        } else {
            self.path.clone()
        };

        LoadOptions {
            paths,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        }
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let config = self.resolve_config(config)?;
        tracing::info!("Executing ingest command for index '{}'", config.index.name);

        let documents = load_documents(&self.load_options(&config))?;
        if documents.is_empty() {
            return Err(AppError::Ingest("No documents found".to_string()));
        }

        let index = open_index(&config)?;
        let outcome = bootstrap_index(&config, index.manager.as_ref()).await?;
        tracing::debug!("Index '{}' {}", config.index.name, outcome_label(outcome));

        let api_key = AppConfig::resolve_api_key(&config.embedding.api_key_env).ok();
        let provider = create_provider(
            &config.embedding,
            config.pipeline.dimension,
            api_key.as_deref(),
        )?;

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
        };

        let pipeline = Pipeline::new(PipelineConfig::from(&config), provider, index.writer)?
            .with_progress(progress);

        let stats = pipeline.run(&documents).await?;

        if self.json {
            let output = serde_json::json!({
                "index": config.index.name,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} documents ({} chunks, {} records in {} batches) into '{}' in {:.2}s",
                stats.documents_processed,
                stats.chunks_created,
                stats.records_upserted,
                stats.batches_submitted,
                config.index.name,
                stats.duration_secs
            );
            if stats.documents_skipped_empty > 0 {
                println!("Empty documents: {}", stats.documents_skipped_empty);
            }
            if !stats.failed_documents.is_empty() {
                println!("Failed documents ({}):", stats.failed_documents.len());
                for source_id in &stats.failed_documents {
                    println!("  {}", source_id);
                }
            }
        }

        Ok(())
    }
}
