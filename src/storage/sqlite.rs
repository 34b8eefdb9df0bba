//! SQLite Key-Value Backend
//!
//! Durable backend storing blobs in a single `kv_blobs` table inside the
//! platform data directory. Uses WAL mode; every write replaces the whole
//! blob for its key.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

use crate::shared::error::StorageError;
use crate::storage::KeyValueStore;

/// SQLite-backed key-value store.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create the store at the default platform location.
    pub async fn new() -> Result<Self, StorageError> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(&path).await
    }

    /// Open or create a store at an explicit path.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let database_url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&database_url).await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA temp_store=MEMORY").execute(&pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_blobs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Default database location inside the platform data directory.
    fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("driftchat")
            .join("offline.db")
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT OR REPLACE INTO kv_blobs (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
