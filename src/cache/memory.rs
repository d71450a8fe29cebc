use super::{CacheStore, StoredBlob};
use crate::error::ScrapeError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local store. Concurrent writers to one key: last write wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, String), StoredBlob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, site: &str, key: &str) -> Result<Option<StoredBlob>, ScrapeError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(site.to_string(), key.to_string())).cloned())
    }

    async fn put(&self, site: &str, key: &str, bytes: Vec<u8>) -> Result<(), ScrapeError> {
        let blob = StoredBlob {
            bytes,
            updated_at: Utc::now(),
        };
        self.entries
            .write()
            .await
            .insert((site.to_string(), key.to_string()), blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upsert_and_update_time() {
        let store = MemoryStore::new();
        store.put("s", "k", vec![1]).await.unwrap();
        let first = store.get("s", "k").await.unwrap().unwrap();

        store.put("s", "k", vec![2]).await.unwrap();
        let second = store.get("s", "k").await.unwrap().unwrap();

        assert_eq!(second.bytes, vec![2]);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_to_one_key() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put("s", "k", vec![i; 8]).await.unwrap();
                store.get("s", "k").await.unwrap()
            }));
        }
        for handle in handles {
            let blob = handle.await.unwrap().unwrap();
            // whatever won, it is one writer's whole value
            assert!(blob.bytes.iter().all(|b| *b == blob.bytes[0]));
        }
        assert_eq!(store.len().await, 1);
    }
}
