// src/models/asset.rs

//! Assets discovered on archive pages and their identity.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Category;

/// A single image link discovered on an archive page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Page the link was found on
    pub page_id: u64,
    /// 1-based position of the link within the page
    pub ordinal: usize,
    /// Absolute image URL
    pub url: String,
}

impl AssetRef {
    pub fn new(page_id: u64, ordinal: usize, url: impl Into<String>) -> Self {
        Self {
            page_id,
            ordinal,
            url: url.into(),
        }
    }

    /// File stem used for the raw download, unique within a run.
    pub fn temp_name(&self) -> String {
        format!("{}_{}", self.page_id, self.ordinal)
    }
}

/// SHA-256 content hash in lowercase hex, the dedup identity of an image.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash a full in-memory byte buffer.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Finalize an incrementally-fed hasher.
    pub fn from_hasher(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A staged file waiting to be uploaded to the remote store.
#[derive(Debug, Clone)]
pub struct UploadEntry {
    /// Re-encoded file in the staging directory
    pub local_path: PathBuf,
    /// Destination path inside the store
    pub remote_path: String,
    /// Root-relative path (`category/counter.webp`), the value the hash
    /// registry stores
    pub registry_path: String,
    /// Content hash of the original download
    pub fingerprint: Fingerprint,
    /// Bucket the image was assigned to
    pub category: Category,
}
