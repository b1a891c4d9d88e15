// src/services/pages.rs

//! Archive page retrieval and image link extraction.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};

use crate::config::CrawlerConfig;
use crate::error::{AppError, Result};
use crate::models::AssetRef;

/// Result of probing one archive page.
#[derive(Debug)]
pub enum PageFetch {
    /// The page exists; carries its raw HTML.
    Resolved(String),
    /// The page does not exist (HTTP 404).
    Missing,
}

/// Fetches archive pages and pulls gallery image links out of them.
pub struct PageScraper {
    client: Client,
    template: String,
    selector: Selector,
    link_attr: String,
    max_assets: usize,
}

impl PageScraper {
    /// Create a scraper from crawler configuration.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            template: config.page_template.clone(),
            selector: parse_selector(&config.asset_selector)?,
            link_attr: config.link_attr.clone(),
            max_assets: config.max_assets_per_page,
        })
    }

    /// Address of an archive page.
    pub fn page_url(&self, id: u64) -> String {
        self.template.replace("{id}", &id.to_string())
    }

    /// Probe one archive page.
    ///
    /// Only a 404 counts as a missing page. Any other non-success status is
    /// a hard error, so transient server trouble never looks like the end
    /// of the archive.
    pub async fn fetch(&self, id: u64) -> Result<PageFetch> {
        let response = self.client.get(self.page_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PageFetch::Missing);
        }
        let response = response.error_for_status()?;
        Ok(PageFetch::Resolved(response.text().await?))
    }

    /// Extract image links from page HTML, in document order.
    ///
    /// Relative and non-HTTP links are dropped; at most `max_assets` links
    /// are returned. Ordinals are 1-based positions among the kept links.
    pub fn extract_assets(&self, page_id: u64, html: &str) -> Vec<AssetRef> {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .filter_map(|element| element.value().attr(&self.link_attr))
            .filter(|href| is_absolute_http(href))
            .take(self.max_assets)
            .enumerate()
            .map(|(index, href)| AssetRef::new(page_id, index + 1, href))
            .collect()
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn is_absolute_http(href: &str) -> bool {
    match url::Url::parse(href) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
