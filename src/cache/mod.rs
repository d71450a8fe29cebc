//! Compressed page-markup cache, one namespace per site, keyed by a hash of the URL path.

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

use crate::config::CacheBackendConfig;
use crate::error::{self, ScrapeError, Stage};
use crate::utils;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::{Read, Write};
use std::sync::Arc;

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 5;
const BROTLI_LG_WINDOW: u32 = 22;

/// Bytes held by a [`CacheStore`] under one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

/// Durable key/value backing store, keyed by `(site, key)`.
///
/// `put` is an upsert: it creates the entry or overwrites it, with no
/// existence check required of the caller.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, site: &str, key: &str) -> Result<Option<StoredBlob>, ScrapeError>;

    async fn put(&self, site: &str, key: &str, bytes: Vec<u8>) -> Result<(), ScrapeError>;
}

/// Decompressed content of a cache hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedContent {
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// Page markup cache.
///
/// Failures never escape: a failed read is a miss, a failed write is logged.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
}

impl ContentCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn from_config(config: &CacheBackendConfig) -> Self {
        match config {
            CacheBackendConfig::Memory => Self::in_memory(),
            CacheBackendConfig::Filesystem { root_dir } => {
                Self::new(Arc::new(FilesystemStore::new(root_dir)))
            }
        }
    }

    /// Content cached for `url_path` on `site`, or `None` on a miss or any failure
    pub async fn get(&self, site: &str, url_path: &str) -> Option<CachedContent> {
        match self.try_get(site, url_path).await {
            Ok(hit) => hit,
            Err(e) => {
                error::log_absorbed(Stage::Caching, &e);
                None
            }
        }
    }

    /// Stores `content` for `url_path` on `site`; failures are logged and dropped
    pub async fn put(&self, site: &str, url_path: &str, content: &str) {
        if let Err(e) = self.try_put(site, url_path, content).await {
            error::log_absorbed(Stage::Caching, &e);
        }
    }

    pub async fn try_get(
        &self,
        site: &str,
        url_path: &str,
    ) -> Result<Option<CachedContent>, ScrapeError> {
        let key = utils::path_key(url_path);
        let Some(blob) = self.store.get(site, &key).await? else {
            ::log::debug!("cache miss for {}{} ({})", site, url_path, key);
            return Ok(None);
        };

        let content = run_blocking(move || decompress(&blob.bytes)).await?;
        Ok(Some(CachedContent {
            content,
            updated_at: blob.updated_at,
        }))
    }

    pub async fn try_put(
        &self,
        site: &str,
        url_path: &str,
        content: &str,
    ) -> Result<(), ScrapeError> {
        let key = utils::path_key(url_path);
        let raw = content.as_bytes().to_vec();
        let compressed = run_blocking(move || compress(&raw)).await?;

        self.store.put(site, &key, compressed).await?;
        ::log::info!("Cached content for key {} on {}", key, site);
        Ok(())
    }
}

/// Runs CPU-bound codec work off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T, ScrapeError>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ScrapeError::Cache(format!("codec task failed: {}", e)))?
        .map_err(|e| ScrapeError::Cache(e.to_string()))
}

fn compress(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut writer = brotli::CompressorWriter::new(
        Vec::new(),
        BROTLI_BUFFER_SIZE,
        BROTLI_QUALITY,
        BROTLI_LG_WINDOW,
    );
    writer.write_all(raw)?;
    writer.flush()?;
    Ok(writer.into_inner())
}

fn decompress(compressed: &[u8]) -> std::io::Result<String> {
    let mut content = String::new();
    brotli::Decompressor::new(compressed, BROTLI_BUFFER_SIZE).read_to_string(&mut content)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn test_empty_string_round_trip() {
        let cache = ContentCache::in_memory();
        cache.put("example.com", "/", "").await;

        let hit = cache.get("example.com", "/").await.unwrap();
        assert_eq!(hit.content, "");
    }

    #[tokio::test]
    async fn test_multi_megabyte_round_trip() {
        let cache = ContentCache::in_memory();
        let mut page = String::with_capacity(4 * 1024 * 1024);
        let mut i: u64 = 0;
        while page.len() < 3 * 1024 * 1024 {
            page.push_str(&format!("<div class=\"row-{}\">é {} ü</div>\n", i % 97, i));
            i += 1;
        }

        cache.put("example.com", "/big", &page).await;
        let hit = cache.get("example.com", "/big").await.unwrap();
        assert_eq!(hit.content, page);
    }

    #[tokio::test]
    async fn test_content_is_stored_compressed() {
        let store = Arc::new(MemoryStore::new());
        let cache = ContentCache::new(store.clone());
        let page = "<p>repeat</p>".repeat(1000);

        cache.put("example.com", "/p", &page).await;

        let blob = store
            .get("example.com", &utils::path_key("/p"))
            .await
            .unwrap()
            .unwrap();
        assert!(blob.bytes.len() < page.len() / 10);
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let cache = ContentCache::in_memory();
        assert!(cache.get("example.com", "/nothing").await.is_none());
    }

    #[tokio::test]
    async fn test_sites_are_separate_namespaces() {
        let cache = ContentCache::in_memory();
        cache.put("a.example.com", "/p", "from a").await;

        assert!(cache.get("b.example.com", "/p").await.is_none());
        assert_eq!(
            cache.get("a.example.com", "/p").await.unwrap().content,
            "from a"
        );
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = ContentCache::in_memory();
        cache.put("example.com", "/p", "first").await;
        cache.put("example.com", "/p", "second").await;
        assert_eq!(cache.get("example.com", "/p").await.unwrap().content, "second");
    }

    struct BrokenStore {
        corrupt: Mutex<Option<Vec<u8>>>,
    }

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _site: &str, _key: &str) -> Result<Option<StoredBlob>, ScrapeError> {
            match self.corrupt.lock().await.clone() {
                Some(bytes) => Ok(Some(StoredBlob {
                    bytes,
                    updated_at: Utc::now(),
                })),
                None => Err(ScrapeError::Cache("store unreachable".to_string())),
            }
        }

        async fn put(&self, _site: &str, _key: &str, _bytes: Vec<u8>) -> Result<(), ScrapeError> {
            Err(ScrapeError::Cache("store unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let cache = ContentCache::new(Arc::new(BrokenStore {
            corrupt: Mutex::new(None),
        }));

        cache.put("example.com", "/p", "content").await;
        assert!(cache.get("example.com", "/p").await.is_none());
        assert!(cache.try_put("example.com", "/p", "content").await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_blob_reads_as_miss() {
        let cache = ContentCache::new(Arc::new(BrokenStore {
            // valid brotli, invalid UTF-8
            corrupt: Mutex::new(Some(compress(&[0xff, 0xfe, 0xfd]).unwrap())),
        }));

        assert!(cache.try_get("example.com", "/p").await.is_err());
        assert!(cache.get("example.com", "/p").await.is_none());
    }
}
