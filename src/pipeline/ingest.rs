// src/pipeline/ingest.rs

//! One batch run: load remote state, crawl, sync, report.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::{Config, StagingConfig};
use crate::error::Result;
use crate::models::{CategoryCounters, Checkpoint, DedupRegistry, UploadEntry};
use crate::pipeline::crawl::{CrawlStats, Crawler, Termination};
use crate::pipeline::sync::{SyncStats, run_sync};
use crate::storage::{RemoteStore, paths, read_json};

/// Everything a finished run reports.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub termination: Termination,
    pub crawl: CrawlStats,
    pub sync: SyncStats,
    pub checkpoint: Checkpoint,
}

/// Run the whole pipeline once against the given store.
pub async fn run_ingest(config: &Config, store: &dyn RemoteStore) -> Result<RunReport> {
    config.validate()?;
    let started_at = Utc::now();

    let root_dir = &config.remote.root_dir;
    let checkpoint = load_checkpoint(store, config.crawler.start_id).await?;
    let mut registry = load_registry(store, root_dir).await?;
    let mut counters = load_counters(store, root_dir).await?;
    log::info!(
        "Resuming after page {} ({} known fingerprints)",
        checkpoint.last_id,
        registry.committed_len()
    );

    prepare_workspace(&config.staging).await?;

    let crawler = Crawler::new(config)?;
    let mut queue = Vec::new();
    let outcome = crawler
        .run(checkpoint, &mut registry, &mut counters, &mut queue)
        .await?;

    log_pending(&queue);

    let checkpoint = Checkpoint {
        last_id: outcome.stats.last_resolved,
    };
    let sync = run_sync(store, root_dir, &queue, &mut registry, &mut counters, checkpoint).await?;

    cleanup_workspace(&config.staging).await;

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        termination: outcome.termination,
        crawl: outcome.stats,
        sync,
        checkpoint,
    };
    log_report(&report);
    Ok(report)
}

/// Load the checkpoint, seeding one before the configured start id when the
/// store has none yet.
async fn load_checkpoint(store: &dyn RemoteStore, start_id: u64) -> Result<Checkpoint> {
    Ok(read_json(store, paths::CHECKPOINT_KEY)
        .await?
        .unwrap_or_else(|| Checkpoint::seed(start_id)))
}

async fn load_registry(store: &dyn RemoteStore, root_dir: &str) -> Result<DedupRegistry> {
    Ok(read_json(store, &paths::registry_key(root_dir))
        .await?
        .map(DedupRegistry::from_snapshot)
        .unwrap_or_default())
}

async fn load_counters(store: &dyn RemoteStore, root_dir: &str) -> Result<CategoryCounters> {
    Ok(read_json(store, &paths::counters_key(root_dir))
        .await?
        .map(CategoryCounters::from_snapshot)
        .unwrap_or_else(|| CategoryCounters::from_snapshot(BTreeMap::new())))
}

/// Reset the transient directories to empty.
async fn prepare_workspace(staging: &StagingConfig) -> Result<()> {
    for dir in [&staging.temp_dir, &staging.staging_dir] {
        remove_dir(dir).await;
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// Drop the transient directories once their contents are synced.
async fn cleanup_workspace(staging: &StagingConfig) {
    remove_dir(&staging.temp_dir).await;
    remove_dir(&staging.staging_dir).await;
}

/// Best-effort recursive removal.
async fn remove_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove {:?}: {}", dir, e),
    }
}

/// Summarize the upload queue per category before syncing.
fn log_pending(queue: &[UploadEntry]) {
    if queue.is_empty() {
        log::info!("Nothing new to upload");
        return;
    }
    let mut per_category: BTreeMap<String, usize> = BTreeMap::new();
    for entry in queue {
        *per_category.entry(entry.category.code()).or_insert(0) += 1;
    }
    let breakdown: Vec<String> = per_category
        .iter()
        .map(|(code, count)| format!("{code} {count}"))
        .collect();
    log::info!("Pending uploads: {} ({})", queue.len(), breakdown.join(", "));
}

fn log_report(report: &RunReport) {
    let stats = &report.crawl;
    let elapsed = (report.finished_at - report.started_at).num_seconds();
    log::info!("Run finished: {} ({}s)", report.termination, elapsed);
    log::info!(
        "Pages: {} ok, {} empty, {} missing",
        stats.pages_ok,
        stats.pages_empty,
        stats.pages_missing
    );
    log::info!(
        "Assets: {} discovered, {} accepted, {} duplicates, {} rejected ({} undecodable, {} too small), {} download failures, {} encode failures",
        stats.assets_seen,
        stats.accepted,
        stats.duplicates,
        stats.rejected(),
        stats.rejected_undecodable,
        stats.rejected_too_small,
        stats.download_failures,
        stats.encode_failures
    );
    log::info!(
        "Uploads: {} succeeded, {} failed",
        report.sync.uploaded,
        report.sync.failed
    );
    if report.sync.persisted {
        log::info!("Checkpoint: {}", report.checkpoint.last_id);
    } else {
        log::info!(
            "Checkpoint: {} (not persisted; every upload failed)",
            report.checkpoint.last_id
        );
    }
}
