// src/lib.rs

//! gleaner: mirrors a sequential image archive into a categorized,
//! deduplicated GitHub-backed store.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
