//! Document store for uploaded report PDFs
//!
//! A directory of blobs keyed by an opaque name. Uploads are written by an
//! external collaborator; the validation core only reads. Multiple chunk
//! extractions may read the same blob concurrently without coordination
//! since nothing mutates a stored document.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StoreError;

/// Filesystem-backed read-only document store
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Create a store over the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the store reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a stored document by key
    pub async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.path_for(key)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(key = %key, bytes = bytes.len(), "Loaded stored document");
                Ok(Bytes::from(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Whether a document exists under the key
    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// Resolve a key to a path, rejecting anything that could escape the
    /// store directory
    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.starts_with('.')
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

/// Hex-encoded SHA256 of a document payload, surfaced in response metadata
/// so callers can pin results to exact document content
pub fn sha256_hex(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}
