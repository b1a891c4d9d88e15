// src/models/state.rs

//! Persistent run state: dedup registry, per-category counters, checkpoint.
//!
//! The registry keeps two views. `committed` mirrors the remote snapshot and
//! only ever grows when an upload has actually landed; `pending` covers
//! images accepted earlier in the same run so a page cannot re-accept a
//! duplicate before the sync phase runs. Only the committed view is
//! persisted, which keeps failed uploads retryable on the next run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Category, Fingerprint};

/// Content-hash registry backing duplicate detection.
#[derive(Debug, Clone, Default)]
pub struct DedupRegistry {
    committed: BTreeMap<Fingerprint, String>,
    pending: BTreeMap<Fingerprint, String>,
}

impl DedupRegistry {
    /// Rebuild the committed view from a persisted snapshot.
    pub fn from_snapshot(snapshot: BTreeMap<Fingerprint, String>) -> Self {
        Self {
            committed: snapshot,
            pending: BTreeMap::new(),
        }
    }

    /// True if the fingerprint is known, committed or pending.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.committed.contains_key(fingerprint) || self.pending.contains_key(fingerprint)
    }

    /// Register a newly accepted image under its root-relative path. It
    /// stays pending until its upload succeeds.
    pub fn record(&mut self, fingerprint: Fingerprint, path: impl Into<String>) {
        self.pending.insert(fingerprint, path.into());
    }

    /// Promote a pending entry after its upload landed.
    pub fn commit(&mut self, fingerprint: &Fingerprint) {
        if let Some(path) = self.pending.remove(fingerprint) {
            self.committed.insert(fingerprint.clone(), path);
        }
    }

    /// The view that gets persisted: committed entries only.
    pub fn snapshot(&self) -> &BTreeMap<Fingerprint, String> {
        &self.committed
    }

    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Monotonic per-category sequence numbers; the source of store file names.
#[derive(Debug, Clone, Default)]
pub struct CategoryCounters {
    counts: BTreeMap<String, u64>,
}

impl CategoryCounters {
    /// Rebuild from a persisted snapshot.
    pub fn from_snapshot(snapshot: BTreeMap<String, u64>) -> Self {
        let mut counters = Self { counts: snapshot };
        counters.ensure_all();
        counters
    }

    /// Make sure every category has an entry so snapshots always list all
    /// four buckets.
    pub fn ensure_all(&mut self) {
        for category in Category::ALL {
            self.counts.entry(category.code()).or_insert(0);
        }
    }

    /// Claim the next sequence number for a category.
    pub fn assign_next(&mut self, category: Category) -> u64 {
        let slot = self.counts.entry(category.code()).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Return a claimed number after the image failed to stage or upload,
    /// healing the gap the failed assignment would leave.
    pub fn release(&mut self, category: Category) {
        if let Some(slot) = self.counts.get_mut(&category.code()) {
            *slot = slot.saturating_sub(1);
        }
    }

    pub fn get(&self, category: Category) -> u64 {
        self.counts.get(&category.code()).copied().unwrap_or(0)
    }

    /// The view that gets persisted.
    pub fn snapshot(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }
}

/// Highest page id known to be fully processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_id: u64,
}

impl Checkpoint {
    /// Seed for a store with no checkpoint yet: one before the configured
    /// start so the first probe hits `start_id` itself.
    pub fn seed(start_id: u64) -> Self {
        Self {
            last_id: start_id.saturating_sub(1),
        }
    }

    /// First page id the next run should probe.
    pub fn next_id(&self) -> u64 {
        self.last_id + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Brightness, Orientation};

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::of_bytes(&[n])
    }

    #[test]
    fn pending_entries_dedup_but_are_not_persisted() {
        let mut registry = DedupRegistry::default();
        registry.record(fp(1), "hd/1.webp");

        assert!(registry.contains(&fp(1)));
        assert!(registry.snapshot().is_empty());
        assert_eq!(registry.pending_len(), 1);
    }

    #[test]
    fn commit_moves_entry_into_snapshot() {
        let mut registry = DedupRegistry::default();
        registry.record(fp(1), "hd/1.webp");
        registry.commit(&fp(1));

        assert!(registry.contains(&fp(1)));
        assert_eq!(
            registry.snapshot().get(&fp(1)).map(String::as_str),
            Some("hd/1.webp")
        );
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(registry.committed_len(), 1);
    }

    #[test]
    fn snapshot_seeds_committed_view() {
        let mut seed = BTreeMap::new();
        seed.insert(fp(7), "vl/3.webp".to_string());
        let registry = DedupRegistry::from_snapshot(seed);

        assert!(registry.contains(&fp(7)));
        assert_eq!(registry.committed_len(), 1);
    }

    #[test]
    fn counters_assign_and_release() {
        let mut counters = CategoryCounters::default();
        let wide_dark = Category::new(Orientation::Wide, Brightness::Dark);

        assert_eq!(counters.assign_next(wide_dark), 1);
        assert_eq!(counters.assign_next(wide_dark), 2);
        counters.release(wide_dark);
        assert_eq!(counters.get(wide_dark), 1);
        assert_eq!(counters.assign_next(wide_dark), 2);
    }

    #[test]
    fn ensure_all_lists_every_bucket() {
        let counters = CategoryCounters::from_snapshot(BTreeMap::new());
        let codes: Vec<&str> = counters.snapshot().keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["hd", "hl", "vd", "vl"]);
    }

    #[test]
    fn seed_checkpoint_probes_start_id_first() {
        let checkpoint = Checkpoint::seed(342);
        assert_eq!(checkpoint.last_id, 341);
        assert_eq!(checkpoint.next_id(), 342);

        // A start of zero must not underflow.
        assert_eq!(Checkpoint::seed(0).next_id(), 1);
    }
}
