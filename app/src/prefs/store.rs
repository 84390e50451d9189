use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StoreError;

/// String key-value persistence backing the preference collections.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Rows of the `preferences` table created by [`crate::db::init_db`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.db)
                .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO preferences (key, value)
            VALUES (?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Process-local store, used in tests and when persistence is not wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    #[tokio::test]
    async fn sqlite_store_upserts_and_deletes() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let store = SqliteStore::new(pool);

        assert_eq!(store.get("cinema-favorites").await.unwrap(), None);

        store.set("cinema-favorites", "[550]").await.unwrap();
        store.set("cinema-favorites", "[550,1399]").await.unwrap();
        assert_eq!(
            store.get("cinema-favorites").await.unwrap().as_deref(),
            Some("[550,1399]")
        );

        store.delete("cinema-favorites").await.unwrap();
        assert_eq!(store.get("cinema-favorites").await.unwrap(), None);

        store.delete("cinema-favorites").await.unwrap();
    }

    #[tokio::test]
    async fn memory_store_behaves_like_a_map() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("cinema-ratings", "{}").await.unwrap();
        store.set("cinema-ratings", "{\"550\":7}").await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("cinema-ratings").await.unwrap().as_deref(),
            Some("{\"550\":7}")
        );

        store.delete("cinema-ratings").await.unwrap();
        assert!(store.is_empty());
    }
}
