//! Vector index abstraction.
//!
//! Two seams separate the pipeline from any concrete vector store:
//! - [`IndexWriter`] receives upsert batches during a run
//! - [`IndexManager`] checks, creates and waits for the index beforehand

use crate::types::VectorRecord;
use docvec_core::config::Metric;
use docvec_core::{AppError, AppResult};
use std::time::Duration;

/// Writes batches of vector records into a named index.
#[async_trait::async_trait]
pub trait IndexWriter: Send + Sync {
    /// Insert or replace `records` in `index_name`.
    ///
    /// Records are given in submission order. Implementations must treat the
    /// batch as one request: either it is accepted or an error is returned.
    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> AppResult<()>;
}

/// Index lifecycle operations used once before a run.
#[async_trait::async_trait]
pub trait IndexManager: Send + Sync {
    /// Whether an index with this name exists.
    async fn index_exists(&self, name: &str) -> AppResult<bool>;

    /// Vector dimension of an existing index, `None` if it is unknown.
    async fn index_dimension(&self, name: &str) -> AppResult<Option<usize>>;

    /// Create an index. Only called when `index_exists` returned false.
    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()>;

    /// Whether a (possibly just created) index accepts writes.
    async fn is_ready(&self, _name: &str) -> AppResult<bool> {
        Ok(true)
    }
}

/// What [`ensure_index`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyExists,
    Created,
}

/// Default delay between readiness checks.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Make sure `name` exists, creating it and waiting until it is ready if not.
///
/// An existing index must have `dimension` vectors, otherwise this returns
/// [`AppError::Config`] before anything is written. The readiness wait is
/// bounded by `ready_timeout`; running out of time is an error.
pub async fn ensure_index(
    manager: &dyn IndexManager,
    name: &str,
    dimension: usize,
    metric: Metric,
    ready_timeout: Duration,
    poll_interval: Duration,
) -> AppResult<EnsureOutcome> {
    tracing::info!("Checking index '{}'", name);

    if manager.index_exists(name).await? {
        match manager.index_dimension(name).await? {
            Some(existing) if existing != dimension => {
                return Err(AppError::Config(format!(
                    "Index '{}' has dimension {}, but the pipeline produces {}",
                    name, existing, dimension
                )));
            }
            Some(_) => {}
            None => tracing::warn!("Could not read the dimension of index '{}'", name),
        }
        tracing::info!("Index '{}' already exists", name);
        return Ok(EnsureOutcome::AlreadyExists);
    }

    tracing::info!(
        "Creating index '{}' (dimension {}, metric {})",
        name,
        dimension,
        metric.as_str()
    );
    manager.create_index(name, dimension, metric).await?;

    tracing::info!("Waiting up to {:?} for index '{}' to be ready", ready_timeout, name);
    let wait = async {
        loop {
            if manager.is_ready(name).await? {
                return Ok::<(), AppError>(());
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    match tokio::time::timeout(ready_timeout, wait).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(AppError::Index(format!(
                "Index '{}' was not ready after {:?}",
                name, ready_timeout
            )))
        }
    }

    tracing::info!("Index '{}' is ready", name);
    Ok(EnsureOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeManager {
        exists: bool,
        existing_dimension: Option<usize>,
        ready_after_polls: Option<usize>,
        polls: AtomicUsize,
        created: Mutex<Vec<(String, usize, Metric)>>,
        fail_create: AtomicBool,
    }

    #[async_trait::async_trait]
    impl IndexManager for FakeManager {
        async fn index_exists(&self, _name: &str) -> AppResult<bool> {
            Ok(self.exists)
        }

        async fn index_dimension(&self, _name: &str) -> AppResult<Option<usize>> {
            Ok(self.existing_dimension)
        }

        async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(AppError::Index("quota exceeded".to_string()));
            }
            self.created
                .lock()
                .unwrap()
                .push((name.to_string(), dimension, metric));
            Ok(())
        }

        async fn is_ready(&self, _name: &str) -> AppResult<bool> {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(self.ready_after_polls.is_some_and(|n| polls >= n))
        }
    }

    async fn run(manager: &FakeManager) -> AppResult<EnsureOutcome> {
        ensure_index(
            manager,
            "docs",
            768,
            Metric::Cosine,
            Duration::from_millis(200),
            Duration::from_millis(5),
        )
        .await
    }

    #[tokio::test]
    async fn test_existing_index_untouched() {
        let manager = FakeManager {
            exists: true,
            existing_dimension: Some(768),
            ..Default::default()
        };

        assert_eq!(run(&manager).await.unwrap(), EnsureOutcome::AlreadyExists);
        assert!(manager.created.lock().unwrap().is_empty());
        assert_eq!(manager.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_existing_index_wrong_dimension() {
        let manager = FakeManager {
            exists: true,
            existing_dimension: Some(1536),
            ..Default::default()
        };

        let err = run(&manager).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("1536")));
        assert!(manager.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_existing_index_unknown_dimension() {
        let manager = FakeManager {
            exists: true,
            ..Default::default()
        };

        assert_eq!(run(&manager).await.unwrap(), EnsureOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_missing_index_created_and_awaited() {
        let manager = FakeManager {
            ready_after_polls: Some(3),
            ..Default::default()
        };

        assert_eq!(run(&manager).await.unwrap(), EnsureOutcome::Created);
        assert_eq!(
            *manager.created.lock().unwrap(),
            vec![("docs".to_string(), 768, Metric::Cosine)]
        );
        assert_eq!(manager.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_readiness_timeout() {
        let manager = FakeManager::default();

        let err = run(&manager).await.unwrap_err();
        assert!(matches!(err, AppError::Index(ref msg) if msg.contains("not ready")));
    }

    #[tokio::test]
    async fn test_create_failure_propagates() {
        let manager = FakeManager::default();
        manager.fail_create.store(true, Ordering::SeqCst);

        let err = run(&manager).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
