// src/pipeline/crawl.rs

//! The sequential page walk.
//!
//! Pages are probed one id at a time starting after the checkpoint. A run of
//! consecutive missing pages ends the walk; a hard fetch error stops it
//! immediately, leaving that id unresolved so the next run probes it again.
//! Pages that exist but carry no image links count as progress, not as
//! misses.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::config::{ClassifyConfig, Config};
use crate::error::Result;
use crate::models::{AssetRef, CategoryCounters, Checkpoint, DedupRegistry, UploadEntry};
use crate::services::{
    AssetDownloader, Download, PageFetch, PageScraper, Rejection, Stager, classify,
};

/// Why the walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The configured run of consecutive missing pages was reached.
    Exhausted,
    /// A hard error stopped the walk before the archive end was seen.
    Faulted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => f.write_str("archive exhausted"),
            Termination::Faulted => f.write_str("halted on error"),
        }
    }
}

/// Tallies for one walk.
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    pub pages_ok: u64,
    pub pages_empty: u64,
    pub pages_missing: u64,
    pub assets_seen: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub rejected_undecodable: u64,
    pub rejected_too_small: u64,
    pub download_failures: u64,
    pub encode_failures: u64,
    /// Highest conclusively resolved page id; the next checkpoint value.
    pub last_resolved: u64,
}

impl CrawlStats {
    pub fn rejected(&self) -> u64 {
        self.rejected_undecodable + self.rejected_too_small
    }
}

/// Result of the walk phase.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub termination: Termination,
    pub stats: CrawlStats,
}

/// Drives the walk: fetch, download, accept, stage.
pub struct Crawler {
    scraper: PageScraper,
    downloader: AssetDownloader,
    stager: Stager,
    classify: ClassifyConfig,
    miss_threshold: u32,
    request_delay: Duration,
    concurrency: usize,
}

impl Crawler {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            scraper: PageScraper::new(&config.crawler)?,
            downloader: AssetDownloader::new(&config.crawler, &config.staging.temp_dir)?,
            stager: Stager::new(&config.staging, &config.remote.root_dir),
            classify: config.classify.clone(),
            miss_threshold: config.crawler.miss_threshold,
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
            concurrency: config.crawler.max_concurrent_downloads.max(1),
        })
    }

    /// Walk pages from the checkpoint until the archive runs out or a hard
    /// error stops the run. Accepted images end up staged and queued.
    pub async fn run(
        &self,
        checkpoint: Checkpoint,
        registry: &mut DedupRegistry,
        counters: &mut CategoryCounters,
        queue: &mut Vec<UploadEntry>,
    ) -> Result<CrawlOutcome> {
        let mut stats = CrawlStats {
            last_resolved: checkpoint.last_id,
            ..CrawlStats::default()
        };
        let mut id = checkpoint.next_id();
        let mut consecutive_misses = 0u32;

        let termination = loop {
            match self.scraper.fetch(id).await {
                Ok(PageFetch::Resolved(html)) => {
                    consecutive_misses = 0;
                    let assets = self.scraper.extract_assets(id, &html);
                    if assets.is_empty() {
                        stats.pages_empty += 1;
                        log::info!("Page {} has no image links", id);
                    } else {
                        stats.pages_ok += 1;
                        log::info!("Page {}: {} image links", id, assets.len());
                        self.process_assets(assets, registry, counters, queue, &mut stats)
                            .await;
                    }
                    stats.last_resolved = id;
                }
                Ok(PageFetch::Missing) => {
                    consecutive_misses += 1;
                    stats.pages_missing += 1;
                    log::info!(
                        "Page {} missing ({}/{})",
                        id,
                        consecutive_misses,
                        self.miss_threshold
                    );
                    if consecutive_misses >= self.miss_threshold {
                        break Termination::Exhausted;
                    }
                }
                Err(e) => {
                    // This id stays unresolved; the checkpoint must not
                    // move past it.
                    log::error!("Page {} fetch failed: {}", id, e);
                    break Termination::Faulted;
                }
            }

            id += 1;
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        };

        Ok(CrawlOutcome { termination, stats })
    }

    /// Download a page's assets concurrently, then accept and stage the
    /// results strictly in document order.
    async fn process_assets(
        &self,
        assets: Vec<AssetRef>,
        registry: &mut DedupRegistry,
        counters: &mut CategoryCounters,
        queue: &mut Vec<UploadEntry>,
        stats: &mut CrawlStats,
    ) {
        stats.assets_seen += assets.len() as u64;

        let mut downloads = stream::iter(assets)
            .map(|asset| async move {
                let result = self.downloader.fetch(&asset).await;
                (asset, result)
            })
            .buffered(self.concurrency);

        while let Some((asset, result)) = downloads.next().await {
            match result {
                Ok(download) => {
                    self.process_downloaded(download, registry, counters, queue, stats)
                        .await;
                }
                Err(e) => {
                    stats.download_failures += 1;
                    log::warn!(
                        "Download failed for {} (page {}): {}",
                        asset.url,
                        asset.page_id,
                        e
                    );
                }
            }
        }
    }

    /// Accept or discard one finished download.
    async fn process_downloaded(
        &self,
        download: Download,
        registry: &mut DedupRegistry,
        counters: &mut CategoryCounters,
        queue: &mut Vec<UploadEntry>,
        stats: &mut CrawlStats,
    ) {
        if registry.contains(&download.fingerprint) {
            stats.duplicates += 1;
            log::info!(
                "Duplicate content at {} (page {})",
                download.asset.url,
                download.asset.page_id
            );
            discard(&download.path).await;
            return;
        }

        let bytes = match tokio::fs::read(&download.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                stats.download_failures += 1;
                log::warn!("Could not read downloaded file {:?}: {}", download.path, e);
                return;
            }
        };

        match classify(&bytes, &self.classify) {
            Ok((image, category)) => {
                let staged = self
                    .stager
                    .stage(&image, category, download.fingerprint.clone(), counters)
                    .await;
                match staged {
                    Ok(entry) => {
                        registry.record(entry.fingerprint.clone(), &entry.registry_path);
                        log::info!("Accepted {} -> {}", download.asset.url, entry.remote_path);
                        queue.push(entry);
                        stats.accepted += 1;
                    }
                    Err(e) => {
                        stats.encode_failures += 1;
                        log::warn!("Staging failed for {}: {}", download.asset.url, e);
                    }
                }
            }
            Err(Rejection::Undecodable) => {
                stats.rejected_undecodable += 1;
                log::info!("Rejected {} (undecodable)", download.asset.url);
            }
            Err(Rejection::TooSmall { width, height }) => {
                stats.rejected_too_small += 1;
                log::info!(
                    "Rejected {} ({}x{} below minimum)",
                    download.asset.url,
                    width,
                    height
                );
            }
        }

        discard(&download.path).await;
    }
}

/// Best-effort removal of a temp file.
async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::debug!("Could not remove temp file {:?}: {}", path, e);
    }
}
