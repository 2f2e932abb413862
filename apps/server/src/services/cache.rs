// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk-based cache of converted assets using cacache.

use crate::error::ApiError;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Content-addressable disk cache.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    /// Create a new cache in the specified directory.
    pub async fn new(cache_dir: &str) -> Self {
        let path = PathBuf::from(cache_dir);

        if let Err(e) = tokio::fs::create_dir_all(&path).await {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Failed to create cache directory"
            );
        }

        Self { cache_dir: path }
    }

    /// SHA-256 over every part, each prefixed by its length so that
    /// `("ab", "c")` and `("a", "bc")` hash differently.
    pub fn generate_key(parts: &[&[u8]]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        hex::encode(hasher.finalize())
    }

    /// Get raw bytes from cache.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApiError> {
        match cacache::read(&self.cache_dir, key).await {
            Ok(data) => Ok(Some(data)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(e) => Err(ApiError::Cache(e.to_string())),
        }
    }

    /// Set raw bytes in cache.
    pub async fn set_bytes(&self, key: &str, data: &[u8]) -> Result<(), ApiError> {
        cacache::write(&self.cache_dir, key, data).await?;
        tracing::debug!(key = %key, size = data.len(), "Cached asset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_separates_parts() {
        let a = DiskCache::generate_key(&[b"ab", b"c"]);
        let b = DiskCache::generate_key(&[b"a", b"bc"]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(a, DiskCache::generate_key(&[b"ab", b"c"]));
    }

    #[tokio::test]
    async fn test_bytes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_str().unwrap()).await;

        assert_eq!(cache.get_bytes("missing").await.unwrap(), None);
        cache.set_bytes("k", b"glTF....").await.unwrap();
        assert_eq!(cache.get_bytes("k").await.unwrap().as_deref(), Some(&b"glTF...."[..]));
    }
}
