//! libSQL implementation of `MappingStore`

use std::path::Path;

use async_trait::async_trait;
use libsql::{params, Builder, Connection, Database};

use super::MappingStore;
use crate::error::StoreError;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Mapping store backed by a local libSQL database file.
pub struct LibSqlMappingStore {
    _db: Database,
    conn: Connection,
}

impl LibSqlMappingStore {
    /// Open the store at `path`, creating it if it doesn't exist.
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::from_database(db).await
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self, StoreError> {
        let conn = db.connect()?;
        // WAL is unavailable for in-memory databases
        conn.execute("PRAGMA journal_mode = WAL;", ()).await.ok();
        migrate(&conn).await?;
        tracing::debug!("Mapping store ready");
        Ok(Self { _db: db, conn })
    }
}

#[async_trait]
impl MappingStore for LibSqlMappingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_entries WHERE key = ?1", params![key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .execute(
                "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .await?;
        Ok(())
    }
}

async fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let version = schema_version(conn).await?;
    if version < 1 {
        migrate_v1(conn).await?;
    }
    Ok(())
}

async fn schema_version(conn: &Connection) -> Result<i32, StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        (),
    )
    .await?;

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    let version = match rows.next().await? {
        Some(row) => row.get::<i32>(0)?,
        None => 0,
    };
    Ok(version)
}

/// Migration to version 1: key-value table
async fn migrate_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        (),
    )
    .await?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![CURRENT_VERSION],
    )
    .await?;
    tracing::info!(version = CURRENT_VERSION, "Mapping store migrated");
    Ok(())
}
