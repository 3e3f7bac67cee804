//! Image storage
//!
//! Oracles that take images by reference need a stable location for every
//! screenshot. [`LocalImageStore`] writes them under a directory and, when a
//! base URL is configured, hands out URLs instead of file paths.

use crate::error::{JourneyError, Result};
use crate::step::ImageRef;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` under `key`, replacing anything already there
    async fn put(&self, bytes: &[u8], key: &str) -> Result<ImageRef>;
}

/// Filesystem-backed image store
pub struct LocalImageStore {
    root: PathBuf,
    base_url: Option<String>,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: None,
        }
    }

    /// Serve references as `<base_url>/<key>` instead of file paths
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Default location under the user's cache directory
    pub fn in_cache_dir() -> Result<Self> {
        let root = dirs::cache_dir()
            .ok_or_else(|| JourneyError::Other("Cannot determine cache directory".to_string()))?
            .join("journey-webdriver")
            .join("images");
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(JourneyError::InvalidInput(format!(
                "Invalid image key: '{}'",
                key
            )));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, bytes: &[u8], key: &str) -> Result<ImageRef> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let location = match &self.base_url {
            Some(base) => format!("{}/{}", base, key),
            None => path.to_string_lossy().to_string(),
        };
        log::debug!("Stored {} ({} bytes) at {}", key, bytes.len(), location);

        Ok(ImageRef {
            key: key.to_string(),
            location,
            size_bytes: bytes.len(),
            sha256: compute_hash(bytes),
        })
    }
}

/// Hex SHA-256 of `bytes`
pub fn compute_hash(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
