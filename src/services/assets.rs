// src/services/assets.rs

//! Streaming image downloads with on-the-fly hashing.

use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::models::{AssetRef, Fingerprint};

/// A raw download on disk plus its content hash.
#[derive(Debug)]
pub struct Download {
    pub asset: AssetRef,
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}

/// Downloads assets into the temp directory.
pub struct AssetDownloader {
    client: Client,
    temp_dir: PathBuf,
}

impl AssetDownloader {
    /// Create a downloader writing into the given directory.
    pub fn new(config: &CrawlerConfig, temp_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            temp_dir: temp_dir.into(),
        })
    }

    /// Fetch one asset to disk.
    ///
    /// The hash is fed from the streamed chunks, so the file is never read
    /// back just to fingerprint it.
    pub async fn fetch(&self, asset: &AssetRef) -> Result<Download> {
        let response = self
            .client
            .get(&asset.url)
            .send()
            .await?
            .error_for_status()?;

        let path = self.temp_dir.join(asset.temp_name());
        let mut file = tokio::fs::File::create(&path).await?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(Download {
            asset: asset.clone(),
            path,
            fingerprint: Fingerprint::from_hasher(hasher),
        })
    }
}
