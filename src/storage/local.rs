// src/storage/local.rs

//! Filesystem-backed store.
//!
//! Mirrors the remote layout under a local directory so runs can be pointed
//! at a plain folder during development and in tests. Revisions are content
//! hashes, which gives the same conflict semantics as the hosted backend:
//! a guarded write fails when the file changed underneath the caller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{RemoteStore, Revision};

/// Store backend rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Full filesystem path for a store path.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Read a file, returning None if it doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Revision of a byte buffer: its content hash.
    fn content_revision(bytes: &[u8]) -> Revision {
        Revision::new(hex::encode(Sha256::digest(bytes)))
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn revision(&self, path: &str) -> Result<Option<Revision>> {
        Ok(self
            .read_bytes(path)
            .await?
            .map(|bytes| Self::content_revision(&bytes)))
    }

    async fn read(&self, path: &str) -> Result<Option<(Vec<u8>, Revision)>> {
        Ok(self.read_bytes(path).await?.map(|bytes| {
            let revision = Self::content_revision(&bytes);
            (bytes, revision)
        }))
    }

    async fn write(
        &self,
        path: &str,
        bytes: &[u8],
        message: &str,
        expected: Option<&Revision>,
    ) -> Result<()> {
        let current = self.read_bytes(path).await?;
        match (&current, expected) {
            (Some(_), None) => {
                return Err(AppError::RevisionConflict { path: path.into() });
            }
            (None, Some(_)) => {
                return Err(AppError::RevisionConflict { path: path.into() });
            }
            (Some(current), Some(expected)) => {
                if Self::content_revision(current) != *expected {
                    return Err(AppError::RevisionConflict { path: path.into() });
                }
            }
            (None, None) => {}
        }

        let full_path = self.path(path);
        self.ensure_dir(&full_path).await?;

        // Write to temp, then rename, so readers never see partial content.
        let tmp = full_path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, &full_path).await?;

        log::debug!("write {} ({})", path, message);
        Ok(())
    }
}
