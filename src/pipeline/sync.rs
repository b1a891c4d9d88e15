// src/pipeline/sync.rs

//! Upload staged files and persist the run-state snapshots.
//!
//! Uploads happen strictly in queue order. A failed upload releases its
//! sequence number and is dropped from the persisted registry, but does not
//! stop the remaining uploads. The snapshots land afterwards in a fixed
//! order (registry, counters, checkpoint), each guarded by the store
//! revision read just before writing. The checkpoint moving forward is the
//! last thing that can happen, so a crash at any point leaves a state the
//! next run repairs by re-probing.

use crate::error::Result;
use crate::models::{CategoryCounters, Checkpoint, DedupRegistry, UploadEntry};
use crate::storage::{RemoteStore, paths, write_json_guarded};

/// Tallies for the sync phase.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub uploaded: u64,
    pub failed: u64,
    /// True once the checkpoint write landed. Stays false on the
    /// every-upload-failed path, where no snapshot is written at all.
    pub persisted: bool,
}

/// Upload queued files in order, then persist the snapshots.
///
/// With a non-empty queue and not a single successful upload, nothing is
/// persisted at all; the next run redoes the work. An empty queue still
/// advances the checkpoint so resolved-but-yieldless id ranges are not
/// probed again.
pub async fn run_sync(
    store: &dyn RemoteStore,
    root_dir: &str,
    queue: &[UploadEntry],
    registry: &mut DedupRegistry,
    counters: &mut CategoryCounters,
    checkpoint: Checkpoint,
) -> Result<SyncStats> {
    let mut stats = SyncStats::default();

    for entry in queue {
        match upload_entry(store, entry).await {
            Ok(()) => {
                registry.commit(&entry.fingerprint);
                stats.uploaded += 1;
            }
            Err(e) => {
                log::warn!("Upload failed for {}: {}", entry.remote_path, e);
                counters.release(entry.category);
                stats.failed += 1;
            }
        }
    }

    if !queue.is_empty() && stats.uploaded == 0 {
        log::error!(
            "All {} uploads failed; leaving the snapshots untouched",
            stats.failed
        );
        return Ok(stats);
    }

    if stats.uploaded > 0 {
        write_json_guarded(
            store,
            &paths::registry_key(root_dir),
            registry.snapshot(),
            &format!("Update hash registry (+{})", stats.uploaded),
        )
        .await?;
        write_json_guarded(
            store,
            &paths::counters_key(root_dir),
            counters.snapshot(),
            "Update image counters",
        )
        .await?;
    }

    write_checkpoint(store, checkpoint).await?;
    stats.persisted = true;
    Ok(stats)
}

/// Persist the progress checkpoint.
pub async fn write_checkpoint(store: &dyn RemoteStore, checkpoint: Checkpoint) -> Result<()> {
    write_json_guarded(
        store,
        paths::CHECKPOINT_KEY,
        &checkpoint,
        &format!("Update progress to {}", checkpoint.last_id),
    )
    .await
}

/// Upload one staged file as a fresh store object.
async fn upload_entry(store: &dyn RemoteStore, entry: &UploadEntry) -> Result<()> {
    let bytes = tokio::fs::read(&entry.local_path).await?;
    // The counter discipline guarantees an unused path, so this is a plain
    // create; a collision means another writer owns the store.
    store
        .write(
            &entry.remote_path,
            &bytes,
            &format!("Add {}", entry.remote_path),
            None,
        )
        .await
}
