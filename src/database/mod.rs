pub mod models;
pub mod queries;
pub mod schema;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::BotError;
pub use models::PendingMerge;
use queries::Queries;

/// Durable association from a head sha to the pull request waiting on it.
///
/// At most one record exists per sha; `put` replaces any earlier record.
#[async_trait]
pub trait PendingMergeStore: Send + Sync {
    async fn get(&self, head_sha: &str) -> Result<Option<PendingMerge>, BotError>;
    async fn put(&self, pending: &PendingMerge) -> Result<(), BotError>;
    /// Returns whether a record was removed.
    async fn delete(&self, head_sha: &str) -> Result<bool, BotError>;
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Database { pool })
    }

    /// Single-connection pool: every sqlite memory connection is its own database.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let database = Database { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(schema::PENDING_MERGES_SCHEMA)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn pending_count(&self) -> Result<i64, sqlx::Error> {
        Queries::count_pending_merges(&self.pool).await
    }
}

#[async_trait]
impl PendingMergeStore for Database {
    async fn get(&self, head_sha: &str) -> Result<Option<PendingMerge>, BotError> {
        Ok(Queries::get_pending_merge(&self.pool, head_sha).await?)
    }

    async fn put(&self, pending: &PendingMerge) -> Result<(), BotError> {
        Ok(Queries::upsert_pending_merge(&self.pool, pending).await?)
    }

    async fn delete(&self, head_sha: &str) -> Result<bool, BotError> {
        Ok(Queries::delete_pending_merge(&self.pool, head_sha).await?)
    }
}

/// Process-local store for tests and throwaway deployments.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PendingMergeStore for MemoryStore {
    async fn get(&self, head_sha: &str) -> Result<Option<PendingMerge>, BotError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(head_sha)
            .map(|issue_number| PendingMerge::new(head_sha, *issue_number)))
    }

    async fn put(&self, pending: &PendingMerge) -> Result<(), BotError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(pending.head_sha.clone(), pending.issue_number);
        Ok(())
    }

    async fn delete(&self, head_sha: &str) -> Result<bool, BotError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(head_sha).is_some())
    }
}
