//! Durable slot state.
//!
//! Each slot is stored under its own key, `blog_post_slot_<n>`, whose value
//! is the id of the assigned post. An empty value means "unassigned". Keys
//! are never deleted, only overwritten.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::Database;
use crate::error::{FeedpinError, Result};

/// Key prefix for slot records.
pub const SLOT_KEY_PREFIX: &str = "blog_post_slot_";

/// Storage key for a slot number (decimal, no leading zeros).
pub fn slot_key(slot: u32) -> String {
    format!("{SLOT_KEY_PREFIX}{slot}")
}

/// Minimal key-value capability the slot state is kept in.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed key-value store.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Create a store over the database's pool.
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// In-memory key-value store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| FeedpinError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Slot-number view over a [`KvStore`].
#[derive(Clone)]
pub struct SlotStateStore {
    kv: Arc<dyn KvStore>,
}

impl SlotStateStore {
    /// Wrap a key-value store.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The post id assigned to `slot`, if any.
    pub async fn get(&self, slot: u32) -> Result<Option<String>> {
        let value = self.kv.get(&slot_key(slot)).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    /// Assign `post_id` to `slot`.
    pub async fn set(&self, slot: u32, post_id: &str) -> Result<()> {
        debug!(slot, post_id, "saving slot state");
        self.kv.set(&slot_key(slot), post_id).await
    }

    /// Mark `slot` as unassigned.
    pub async fn clear(&self, slot: u32) -> Result<()> {
        debug!(slot, "clearing slot state");
        self.kv.set(&slot_key(slot), "").await
    }

    /// The lowest-numbered slot among `slots` that holds `post_id`.
    pub async fn slot_holding(&self, post_id: &str, slots: &[u32]) -> Result<Option<u32>> {
        let mut ordered = slots.to_vec();
        ordered.sort_unstable();
        for slot in ordered {
            if self.get(slot).await?.as_deref() == Some(post_id) {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for SlotStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotStateStore").finish()
    }
}
