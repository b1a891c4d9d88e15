// src/services/stage.rs

//! WebP re-encoding into the staging directory.

use std::path::PathBuf;

use image::DynamicImage;

use crate::config::StagingConfig;
use crate::error::{AppError, Result};
use crate::models::{Category, CategoryCounters, Fingerprint, UploadEntry};
use crate::storage::paths;

/// Re-encodes accepted images and queues them for upload.
pub struct Stager {
    staging_dir: PathBuf,
    quality: f32,
    root_dir: String,
}

impl Stager {
    pub fn new(staging: &StagingConfig, root_dir: impl Into<String>) -> Self {
        Self {
            staging_dir: staging.staging_dir.clone(),
            quality: staging.webp_quality,
            root_dir: root_dir.into(),
        }
    }

    /// Re-encode an accepted image and queue it for upload.
    ///
    /// The sequence number is claimed up front so the file carries its
    /// final store name; if encoding or the write fails the claim is
    /// released again, keeping the sequence gap-free.
    pub async fn stage(
        &self,
        image: &DynamicImage,
        category: Category,
        fingerprint: Fingerprint,
        counters: &mut CategoryCounters,
    ) -> Result<UploadEntry> {
        let sequence = counters.assign_next(category);
        match self.encode_and_write(image, category, sequence).await {
            Ok(local_path) => Ok(UploadEntry {
                local_path,
                remote_path: paths::asset_key(&self.root_dir, category, sequence),
                registry_path: paths::relative_asset_key(category, sequence),
                fingerprint,
                category,
            }),
            Err(e) => {
                counters.release(category);
                Err(e)
            }
        }
    }

    async fn encode_and_write(
        &self,
        image: &DynamicImage,
        category: Category,
        sequence: u64,
    ) -> Result<PathBuf> {
        let rgba = image.to_rgba8();
        let encoded = webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height())
            .encode(self.quality);
        if encoded.is_empty() {
            return Err(AppError::encode("encoder produced no output"));
        }

        // The staging tree mirrors the remote layout.
        let dir = self.staging_dir.join(&self.root_dir).join(category.code());
        tokio::fs::create_dir_all(&dir).await?;
        let local_path = dir.join(format!("{sequence}.webp"));
        tokio::fs::write(&local_path, &*encoded).await?;
        Ok(local_path)
    }
}
