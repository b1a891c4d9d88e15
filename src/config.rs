// src/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Page walk and HTTP behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Image acceptance and categorization settings
    #[serde(default)]
    pub classify: ClassifyConfig,

    /// Local workspace and re-encoding settings
    #[serde(default)]
    pub staging: StagingConfig,

    /// Remote store settings
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if !self.crawler.page_template.contains("{id}") {
            return Err(AppError::validation(
                "crawler.page_template must contain an {id} placeholder",
            ));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.download_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.download_timeout_secs must be > 0",
            ));
        }
        if self.crawler.miss_threshold == 0 {
            return Err(AppError::validation("crawler.miss_threshold must be > 0"));
        }
        if self.crawler.max_assets_per_page == 0 {
            return Err(AppError::validation(
                "crawler.max_assets_per_page must be > 0",
            ));
        }
        if self.crawler.max_concurrent_downloads == 0 {
            return Err(AppError::validation(
                "crawler.max_concurrent_downloads must be > 0",
            ));
        }
        if self.crawler.asset_selector.trim().is_empty() {
            return Err(AppError::validation("crawler.asset_selector is empty"));
        }
        if self.classify.min_dimension == 0 {
            return Err(AppError::validation("classify.min_dimension must be > 0"));
        }
        if self.classify.sample_size == 0 {
            return Err(AppError::validation("classify.sample_size must be > 0"));
        }
        if !(self.staging.webp_quality > 0.0 && self.staging.webp_quality <= 100.0) {
            return Err(AppError::validation(
                "staging.webp_quality must be in (0, 100]",
            ));
        }
        if self.remote.branch.trim().is_empty() {
            return Err(AppError::validation("remote.branch is empty"));
        }
        if self.remote.root_dir.trim().is_empty() {
            return Err(AppError::validation("remote.root_dir is empty"));
        }
        Ok(())
    }
}

/// Page walk and HTTP client behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Archive page address template; `{id}` is replaced by the page id
    #[serde(default = "defaults::page_template")]
    pub page_template: String,

    /// First page id of a fresh deployment (no remote checkpoint yet)
    #[serde(default = "defaults::start_id")]
    pub start_id: u64,

    /// Consecutive missing pages required to conclude the archive is exhausted
    #[serde(default = "defaults::miss_threshold")]
    pub miss_threshold: u32,

    /// Only this many image links per page are processed
    #[serde(default = "defaults::max_assets_per_page")]
    pub max_assets_per_page: usize,

    /// CSS selector matching gallery image anchors
    #[serde(default = "defaults::asset_selector")]
    pub asset_selector: String,

    /// Anchor attribute carrying the image URL
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Page request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Image download timeout in seconds
    #[serde(default = "defaults::download_timeout")]
    pub download_timeout_secs: u64,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Concurrent image downloads within one page
    #[serde(default = "defaults::max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_template: defaults::page_template(),
            start_id: defaults::start_id(),
            miss_threshold: defaults::miss_threshold(),
            max_assets_per_page: defaults::max_assets_per_page(),
            asset_selector: defaults::asset_selector(),
            link_attr: defaults::link_attr(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            download_timeout_secs: defaults::download_timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent_downloads: defaults::max_concurrent_downloads(),
        }
    }
}

/// Image acceptance and categorization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Minimum accepted width and height in pixels
    #[serde(default = "defaults::min_dimension")]
    pub min_dimension: u32,

    /// Side length of the square resample used for the brightness mean
    #[serde(default = "defaults::sample_size")]
    pub sample_size: u32,

    /// Mean lightness (0-255 scale) below which an image counts as dark
    #[serde(default = "defaults::brightness_threshold")]
    pub brightness_threshold: f32,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            min_dimension: defaults::min_dimension(),
            sample_size: defaults::sample_size(),
            brightness_threshold: defaults::brightness_threshold(),
        }
    }
}

/// Local workspace and re-encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Transient directory for raw downloads
    #[serde(default = "defaults::temp_dir")]
    pub temp_dir: PathBuf,

    /// Directory holding re-encoded files until they are uploaded
    #[serde(default = "defaults::staging_dir")]
    pub staging_dir: PathBuf,

    /// Lossy WebP quality for accepted images
    #[serde(default = "defaults::webp_quality")]
    pub webp_quality: f32,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            temp_dir: defaults::temp_dir(),
            staging_dir: defaults::staging_dir(),
            webp_quality: defaults::webp_quality(),
        }
    }
}

/// Remote store settings.
///
/// The access token never lives in the file; it is read from the `GH_TOKEN`
/// environment variable. `TARGET_REPO` overrides `repo` when set, matching
/// the deployment environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Target repository as `owner/name`
    #[serde(default)]
    pub repo: String,

    /// Branch all writes are committed to
    #[serde(default = "defaults::branch")]
    pub branch: String,

    /// Directory under which images and their snapshot documents live
    #[serde(default = "defaults::root_dir")]
    pub root_dir: String,

    /// API base URL; overridable so tests can point at a mock server
    #[serde(default = "defaults::api_base")]
    pub api_base: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            branch: defaults::branch(),
            root_dir: defaults::root_dir(),
            api_base: defaults::api_base(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn page_template() -> String {
        "https://img.hyun.cc/index.php/archives/{id}.html".into()
    }
    pub fn start_id() -> u64 {
        342
    }
    pub fn miss_threshold() -> u32 {
        5
    }
    pub fn max_assets_per_page() -> usize {
        100
    }
    pub fn asset_selector() -> String {
        "a[data-fancybox]".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; gleaner/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn download_timeout() -> u64 {
        60
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent_downloads() -> usize {
        4
    }

    // Classify defaults
    pub fn min_dimension() -> u32 {
        10
    }
    pub fn sample_size() -> u32 {
        100
    }
    pub fn brightness_threshold() -> f32 {
        130.0
    }

    // Staging defaults
    pub fn temp_dir() -> PathBuf {
        PathBuf::from("temp_download")
    }
    pub fn staging_dir() -> PathBuf {
        PathBuf::from("local_images")
    }
    pub fn webp_quality() -> f32 {
        85.0
    }

    // Remote defaults
    pub fn branch() -> String {
        "main".into()
    }
    pub fn root_dir() -> String {
        "ri".into()
    }
    pub fn api_base() -> String {
        "https://api.github.com".into()
    }
}
