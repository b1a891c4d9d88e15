// src/models/mod.rs

//! Domain models for the ingest pipeline.
//!
//! This module contains the data structures shared across services and
//! pipeline stages, organized by their primary purpose.

mod asset;
mod category;
mod state;

// Re-export all public types
pub use asset::{AssetRef, Fingerprint, UploadEntry};
pub use category::{Brightness, Category, Orientation};
pub use state::{CategoryCounters, Checkpoint, DedupRegistry};
