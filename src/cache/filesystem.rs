use super::{CacheStore, StoredBlob};
use crate::error::ScrapeError;
use crate::utils::sanitize_filename;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const BLOB_EXTENSION: &str = "br";

/// Durable store: `<root>/<site>/<key>.br`
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn site_dir(&self, site: &str) -> PathBuf {
        self.root.join(sanitize_filename(site))
    }

    fn blob_path(&self, site: &str, key: &str) -> PathBuf {
        self.site_dir(site)
            .join(format!("{}.{}", sanitize_filename(key), BLOB_EXTENSION))
    }
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn get(&self, site: &str, key: &str) -> Result<Option<StoredBlob>, ScrapeError> {
        let path = self.blob_path(site, key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ScrapeError::Cache(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let updated_at = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(StoredBlob { bytes, updated_at }))
    }

    async fn put(&self, site: &str, key: &str, bytes: Vec<u8>) -> Result<(), ScrapeError> {
        let dir = self.site_dir(site);
        let path = self.blob_path(site, key);

        tokio::task::spawn_blocking(move || upsert(&dir, &path, &bytes))
            .await
            .map_err(|e| ScrapeError::Cache(format!("cache write task failed: {}", e)))?
            .map_err(|e| ScrapeError::Cache(e.to_string()))
    }
}

/// Overwrites the blob atomically; creates the site directory when the
/// overwrite reports it missing.
fn upsert(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    match replace(dir, path, bytes) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            std::fs::create_dir_all(dir)?;
            replace(dir, path, bytes)
        }
        other => other,
    }
}

fn replace(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    // readers see the old blob or the new one, never a partial write
    let mut staged = tempfile::Builder::new()
        .prefix(".staged-")
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
