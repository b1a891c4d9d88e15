// src/services/mod.rs

//! Service layer for the ingest pipeline.
//!
//! This module contains the per-stage logic:
//! - Archive page retrieval (`PageScraper`)
//! - Image downloads (`AssetDownloader`)
//! - Acceptance and categorization (`classify`)
//! - WebP staging (`Stager`)

mod assets;
mod classify;
mod pages;
mod stage;

pub use assets::{AssetDownloader, Download};
pub use classify::{Rejection, classify};
pub use pages::{PageFetch, PageScraper};
pub use stage::Stager;
