// src/pipeline/mod.rs

//! Pipeline entry points and run orchestration.
//!
//! - `run_ingest`: one batch crawl + sync run against a store
//! - `Crawler`: the sequential page walk
//! - `run_sync`: upload staged files and persist the snapshots

pub mod crawl;
pub mod ingest;
pub mod sync;

pub use crawl::{CrawlOutcome, CrawlStats, Crawler, Termination};
pub use ingest::{RunReport, run_ingest};
pub use sync::{SyncStats, run_sync};
