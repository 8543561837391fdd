//! Persistence seam for the local cache.
//!
//! Only the scan list is persisted. The store writes the full list after each
//! mutation and reads it back once on hydration.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{LibraryError, Result};
use crate::models::CachedScan;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persisted scans in stored order. Empty when nothing was saved yet.
    async fn load(&self) -> Result<Vec<CachedScan>>;

    /// Replace the persisted scans.
    async fn save(&self, scans: &[CachedScan]) -> Result<()>;
}

/// Process-local snapshot, lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    scans: Mutex<Vec<CachedScan>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an existing snapshot, as if saved by a previous run.
    pub fn with_scans(scans: Vec<CachedScan>) -> Self {
        Self {
            scans: Mutex::new(scans),
        }
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Vec<CachedScan>> {
        self.scans
            .lock()
            .map(|scans| scans.clone())
            .map_err(|_| LibraryError::Snapshot("snapshot lock poisoned".to_string()))
    }

    async fn save(&self, scans: &[CachedScan]) -> Result<()> {
        let mut guard = self
            .scans
            .lock()
            .map_err(|_| LibraryError::Snapshot("snapshot lock poisoned".to_string()))?;
        *guard = scans.to_vec();
        Ok(())
    }
}

/// SQLite-backed snapshot, one row per scan.
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file and the table.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.initialize().await?;
        info!(path = %path.display(), "Opened scan cache snapshot");
        Ok(store)
    }

    /// Single-connection in-memory database; the connection must stay open
    /// for the data to survive.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::new(pool);
        store.initialize().await?;
        Ok(store)
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cached_scans (
                position INTEGER NOT NULL,
                id TEXT PRIMARY KEY,
                user_identifier TEXT NOT NULL,
                name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                scan_type TEXT NOT NULL,
                status TEXT NOT NULL,
                remote_location TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                uploaded_at INTEGER NOT NULL,
                cached_at INTEGER NOT NULL,
                metadata TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn millis_to_datetime(millis: i64, column: &str) -> Result<chrono::DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| LibraryError::Snapshot(format!("invalid {} timestamp {}", column, millis)))
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self) -> Result<Vec<CachedScan>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_identifier, name, mime_type, scan_type, status,
                   remote_location, size_bytes, uploaded_at, cached_at, metadata
            FROM cached_scans
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scans = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata: BTreeMap<String, String> =
                serde_json::from_str(&row.get::<String, _>("metadata"))
                    .map_err(|e| LibraryError::Snapshot(format!("invalid metadata: {}", e)))?;

            scans.push(CachedScan {
                id: row.get("id"),
                user_identifier: row.get("user_identifier"),
                name: row.get("name"),
                mime_type: row.get("mime_type"),
                scan_type: row.get::<String, _>("scan_type").parse()?,
                status: row.get::<String, _>("status").parse()?,
                remote_location: row.get("remote_location"),
                size_bytes: row.get::<i64, _>("size_bytes") as u64,
                uploaded_at: Self::millis_to_datetime(row.get("uploaded_at"), "uploaded_at")?,
                cached_at: Self::millis_to_datetime(row.get("cached_at"), "cached_at")?,
                metadata,
            });
        }

        debug!(scan_count = scans.len(), "Loaded scan snapshot");
        Ok(scans)
    }

    async fn save(&self, scans: &[CachedScan]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cached_scans")
            .execute(&mut *tx)
            .await?;

        for (position, scan) in scans.iter().enumerate() {
            let metadata = serde_json::to_string(&scan.metadata)
                .map_err(|e| LibraryError::Snapshot(format!("invalid metadata: {}", e)))?;

            sqlx::query(
                r#"
                INSERT INTO cached_scans (
                    position, id, user_identifier, name, mime_type, scan_type, status,
                    remote_location, size_bytes, uploaded_at, cached_at, metadata
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&scan.id)
            .bind(&scan.user_identifier)
            .bind(&scan.name)
            .bind(&scan.mime_type)
            .bind(scan.scan_type.as_str())
            .bind(scan.status.as_str())
            .bind(&scan.remote_location)
            .bind(scan.size_bytes as i64)
            .bind(scan.uploaded_at.timestamp_millis())
            .bind(scan.cached_at.timestamp_millis())
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(scan_count = scans.len(), "Saved scan snapshot");
        Ok(())
    }
}
