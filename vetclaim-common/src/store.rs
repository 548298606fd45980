//! Persistent key-value store
//!
//! The store is the sole durable owner of sessions and scraped records.
//! Components read-modify-write it without transactions across calls, so
//! concurrent cycles resolve as last-writer-wins.

use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;
#[cfg(feature = "sqlx")]
use std::path::Path;

/// Store key schema
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER_DATA: &str = "userData";
    pub const VA_CLAIMS: &str = "vaClaims";
    pub const VA_RATINGS: &str = "vaRatings";
    pub const VA_APPEALS: &str = "vaAppeals";
    pub const VA_LOGGED_IN: &str = "vaLoggedIn";
    pub const VA_LAST_FETCH: &str = "vaLastFetch";
    pub const LAST_SYNC: &str = "lastSync";
    pub const EXTENSION_ENABLED: &str = "extensionEnabled";
    pub const NOTIFICATIONS_ENABLED: &str = "notificationsEnabled";
    pub const SYNC_ENABLED: &str = "syncEnabled";

    /// The three session keys, always written or removed together
    pub const SESSION: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, USER_DATA];
}

/// Durable key-value capability
///
/// `get` omits keys that are absent or hold JSON null.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;

    async fn set(&self, entries: Map<String, Value>) -> Result<()>;

    async fn remove(&self, keys: &[&str]) -> Result<()>;
}

/// Read one key and deserialize it
pub async fn get_value<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    let mut map = store.get(&[key]).await?;
    match map.remove(key) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize and write one key
pub async fn set_value<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let mut map = Map::new();
    map.insert(key.to_string(), serde_json::to_value(value)?);
    store.set(map).await
}

/// Boolean flag where a missing key means enabled
pub async fn flag_enabled(store: &dyn KeyValueStore, key: &str) -> bool {
    match get_value::<bool>(store, key).await {
        Ok(Some(flag)) => flag,
        Ok(None) => true,
        Err(e) => {
            tracing::warn!(key, error = %e, "Unreadable flag, treating as enabled");
            true
        }
    }
}

/// Write the install-time defaults
pub async fn initialize_store(store: &dyn KeyValueStore) -> Result<()> {
    let mut map = Map::new();
    map.insert(keys::EXTENSION_ENABLED.into(), Value::Bool(true));
    map.insert(keys::NOTIFICATIONS_ENABLED.into(), Value::Bool(true));
    map.insert(keys::SYNC_ENABLED.into(), Value::Bool(true));
    map.insert(keys::LAST_SYNC.into(), Value::Null);
    for key in keys::SESSION {
        map.insert(key.into(), Value::Null);
    }
    store.set(map).await?;
    tracing::info!("Store initialized with install defaults");
    Ok(())
}

/// In-process store used by tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry, including nulls
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| {
                entries
                    .get(*k)
                    .filter(|v| !v.is_null())
                    .map(|v| (k.to_string(), v.clone()))
            })
            .collect())
    }

    async fn set(&self, map: Map<String, Value>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.extend(map);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// SQLite-backed store; values are kept as JSON text
#[cfg(feature = "sqlx")]
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[cfg(feature = "sqlx")]
impl SqliteStore {
    /// Open (or create) the store file
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // mode=rwc: read, write, create
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to store: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database (single connection so every query sees it)
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[cfg(feature = "sqlx")]
#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for key in keys {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
                    .bind(*key)
                    .fetch_optional(&self.pool)
                    .await?;

            if let Some((text,)) = row {
                let value: Value = serde_json::from_str(&text)?;
                if !value.is_null() {
                    out.insert(key.to_string(), value);
                }
            }
        }
        Ok(out)
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM kv_store WHERE key = ?")
                .bind(*key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
