// src/storage/mod.rs

//! Store backends for images and run-state snapshots.
//!
//! Everything durable (images, the hash registry, counters and the progress
//! checkpoint) lives in a single versioned object store addressed by
//! `/`-separated paths:
//!
//! ```text
//! progress.json             # last fully processed page id
//! {root_dir}/
//! ├── hash_registry.json    # fingerprint -> category/counter.webp
//! ├── count.json            # per-category sequence counters
//! ├── hd/                   # wide-dark images, 1.webp, 2.webp, ...
//! ├── hl/
//! ├── vd/
//! └── vl/
//! ```
//!
//! Writes are guarded by revisions: every stored object has an opaque
//! [`Revision`], and a write only lands if the caller's expectation about
//! the current revision still holds. A run that lost a race fails with
//! [`AppError::RevisionConflict`](crate::error::AppError::RevisionConflict)
//! instead of clobbering the other writer.

pub mod github;
pub mod local;
pub mod paths;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

// Re-export for convenience
pub use github::GitHubStore;
pub use local::LocalStore;

/// Opaque version marker of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A remote object store with revision-guarded writes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Current revision of an object, or `None` if it does not exist.
    async fn revision(&self, path: &str) -> Result<Option<Revision>>;

    /// Read an object with its revision, or `None` if it does not exist.
    async fn read(&self, path: &str) -> Result<Option<(Vec<u8>, Revision)>>;

    /// Write an object.
    ///
    /// With `expected: None` the object must not exist yet; with
    /// `expected: Some(rev)` it must still be at exactly that revision.
    /// Either mismatch fails with a revision conflict and leaves the store
    /// untouched.
    async fn write(
        &self,
        path: &str,
        bytes: &[u8],
        message: &str,
        expected: Option<&Revision>,
    ) -> Result<()>;
}

/// Read and deserialize a JSON object, `None` if absent.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    path: &str,
) -> Result<Option<T>> {
    match store.read(path).await? {
        Some((bytes, _)) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON object guarded by its current revision.
///
/// The revision is fetched immediately before the write, so the guard
/// window is as small as this process can make it.
pub async fn write_json_guarded<T: Serialize + ?Sized>(
    store: &dyn RemoteStore,
    path: &str,
    value: &T,
    message: &str,
) -> Result<()> {
    let expected = store.revision(path).await?;
    let bytes = serde_json::to_vec_pretty(value)?;
    store.write(path, &bytes, message, expected.as_ref()).await
}
