//! Command handlers for the docvec CLI.
//!
//! This module organizes all CLI commands into separate submodules, plus the
//! index wiring they share.

pub mod config;
pub mod index;
pub mod ingest;

// Re-export command types for convenience
pub use config::ConfigCommand;
pub use index::IndexCommand;
pub use ingest::IngestCommand;

use docvec_core::config::{AppConfig, IndexBackend};
use docvec_core::AppResult;
use docvec_ingest::vector_index::READY_POLL_INTERVAL;
use docvec_ingest::{ensure_index, EnsureOutcome, IndexManager, IndexWriter};
use docvec_ingest::{PineconeIndex, SqliteIndex};
use std::sync::Arc;
use std::time::Duration;

/// The configured backend, seen through both index seams.
pub struct IndexHandles {
    pub writer: Arc<dyn IndexWriter>,
    pub manager: Arc<dyn IndexManager>,
}

/// Open the index backend selected in the configuration.
pub fn open_index(config: &AppConfig) -> AppResult<IndexHandles> {
    match config.index.backend {
        IndexBackend::Pinecone => {
            let api_key = AppConfig::resolve_api_key(&config.index.api_key_env)?;
            let index = Arc::new(PineconeIndex::new(&config.index, &api_key)?);
            Ok(IndexHandles {
                writer: index.clone(),
                manager: index,
            })
        }
        IndexBackend::Sqlite => {
            config.ensure_docvec_dir()?;
            let index = Arc::new(SqliteIndex::open(&config.sqlite_index_path())?);
            Ok(IndexHandles {
                writer: index.clone(),
                manager: index,
            })
        }
    }
}

/// Create the configured index if it does not exist yet.
pub async fn bootstrap_index(
    config: &AppConfig,
    manager: &dyn IndexManager,
) -> AppResult<EnsureOutcome> {
    ensure_index(
        manager,
        &config.index.name,
        config.pipeline.dimension,
        config.index.metric,
        Duration::from_secs(config.index.ready_timeout_secs),
        READY_POLL_INTERVAL,
    )
    .await
}

pub fn outcome_label(outcome: EnsureOutcome) -> &'static str {
    match outcome {
        EnsureOutcome::AlreadyExists => "exists",
        EnsureOutcome::Created => "created",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sqlite_bootstrap() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig {
            workspace: dir.path().to_path_buf(),
            ..Default::default()
        };
        config.index.backend = IndexBackend::Sqlite;
        config.pipeline.dimension = 8;

        let handles = open_index(&config).unwrap();
        assert!(config.sqlite_index_path().exists());

        let first = bootstrap_index(&config, handles.manager.as_ref())
            .await
            .unwrap();
        let second = bootstrap_index(&config, handles.manager.as_ref())
            .await
            .unwrap();

        assert_eq!(outcome_label(first), "created");
        assert_eq!(outcome_label(second), "exists");
    }

    #[test]
    fn test_pinecone_requires_api_key() {
        let mut config = AppConfig::default();
        config.index.api_key_env = "DOCVEC_TEST_UNSET_PINECONE_KEY".to_string();

        assert!(open_index(&config).is_err());
    }
}
