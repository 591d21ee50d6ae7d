//! SQLite-backed local vector index.
//!
//! Stores any number of named indexes in one file. Each upsert batch runs in
//! a single transaction so a batch is either fully written or not at all.

use crate::types::VectorRecord;
use crate::vector_index::{IndexManager, IndexWriter};
use docvec_core::config::Metric;
use docvec_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex").finish_non_exhaustive()
    }
}

impl SqliteIndex {
    /// Open (or create) the index database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

        Self::init(conn, &format!("{:?}", db_path))
    }

    /// In-memory index, mostly useful for tests.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

        Self::init(conn, "memory")
    }

    fn init(conn: Connection, location: &str) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS indexes (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                metric TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vectors (
                index_name TEXT NOT NULL,
                id TEXT NOT NULL,
                vector BLOB NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (index_name, id),
                FOREIGN KEY (index_name) REFERENCES indexes(name)
            );
            "#,
        )
        .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized SQLite index at {}", location);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Index("SQLite connection lock poisoned".to_string()))
    }

    /// Dimension of a registered index.
    pub fn dimension(&self, name: &str) -> AppResult<Option<usize>> {
        let conn = self.lock()?;
        let dimension: Option<i64> = conn
            .query_row(
                "SELECT dimension FROM indexes WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Index(format!("Failed to read index '{}': {}", name, e)))?;

        Ok(dimension.map(|d| d as usize))
    }

    /// Number of vectors stored in an index.
    pub fn count(&self, name: &str) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM vectors WHERE index_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Index(format!("Failed to count vectors: {}", e)))?;

        Ok(count as usize)
    }

    /// Fetch a stored record by id.
    pub fn get(&self, name: &str, id: &str) -> AppResult<Option<VectorRecord>> {
        let conn = self.lock()?;
        let row: Option<(Vec<u8>, String)> = conn
            .query_row(
                "SELECT vector, metadata FROM vectors WHERE index_name = ?1 AND id = ?2",
                params![name, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| AppError::Index(format!("Failed to read vector '{}': {}", id, e)))?;

        row.map(|(bytes, metadata)| {
            Ok(VectorRecord {
                id: id.to_string(),
                values: bytes_to_vector(&bytes)?,
                metadata: serde_json::from_str(&metadata)?,
            })
        })
        .transpose()
    }
}

#[async_trait::async_trait]
impl IndexManager for SqliteIndex {
    async fn index_exists(&self, name: &str) -> AppResult<bool> {
        Ok(self.dimension(name)?.is_some())
    }

    async fn index_dimension(&self, name: &str) -> AppResult<Option<usize>> {
        self.dimension(name)
    }

    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO indexes (name, dimension, metric) VALUES (?1, ?2, ?3)",
            params![name, dimension as i64, metric.as_str()],
        )
        .map_err(|e| AppError::Index(format!("Failed to create index '{}': {}", name, e)))?;

        tracing::debug!(
            "Created SQLite index '{}' (dimension {}, metric {})",
            name,
            dimension,
            metric.as_str()
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl IndexWriter for SqliteIndex {
    async fn upsert(&self, index_name: &str, records: Vec<VectorRecord>) -> AppResult<()> {
        let dimension = self
            .dimension(index_name)?
            .ok_or_else(|| AppError::Index(format!("Index '{}' does not exist", index_name)))?;

        if let Some(bad) = records.iter().find(|r| r.values.len() != dimension) {
            return Err(AppError::Index(format!(
                "Vector '{}' has dimension {}, index '{}' expects {}",
                bad.id,
                bad.values.len(),
                index_name,
                dimension
            )));
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to start transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO vectors (index_name, id, vector, metadata)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| AppError::Index(format!("Failed to prepare upsert: {}", e)))?;

            for record in &records {
                let metadata = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    index_name,
                    record.id,
                    vector_to_bytes(&record.values),
                    metadata
                ])
                .map_err(|e| {
                    AppError::Index(format!("Failed to upsert vector '{}': {}", record.id, e))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit upsert: {}", e)))?;

        tracing::debug!("Upserted {} vectors into '{}'", records.len(), index_name);
        Ok(())
    }
}

/// Little-endian f32 encoding.
fn vector_to_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_vector(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(format!(
            "Invalid vector blob length: {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
