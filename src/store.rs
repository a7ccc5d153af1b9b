//! Blob storage abstraction.
//!
//! The [`BlobStore`] trait is the union contract over file-bytes backends:
//! keys map to blobs, deletes are idempotent, and `public_address` is a pure
//! key-to-URL mapping with no I/O failure mode. [`FsBlobStore`] is the
//! shipped backend, writing one file per key under a local directory that
//! the HTTP server also serves statically.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::StorageConfig;
use crate::error::{ClipError, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, overwriting any existing blob, and return
    /// the blob's public address.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String>;

    /// Remove the blob under `key`. Removing an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Deterministic key-to-URL mapping. Pure; performs no I/O.
    fn public_address(&self, key: &str) -> String;
}

/// Filesystem-backed blob store.
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    /// Open (creating if needed) the storage directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.root).map_err(|e| {
            ClipError::StorageWrite(format!(
                "failed to create storage root {}: {}",
                config.root.display(),
                e
            ))
        })?;
        Ok(Self {
            root: config.root.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.blob_path(key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ClipError::StorageWrite(format!("{}: {}", path.display(), e)))?;
        Ok(self.public_address(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.blob_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClipError::StorageWrite(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn public_address(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
