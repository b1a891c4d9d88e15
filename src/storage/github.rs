// src/storage/github.rs

//! GitHub contents API store backend.
//!
//! Objects map to files in a repository; every write is a commit on the
//! configured branch. The contents API's `sha` field doubles as the
//! revision marker, and its compare-and-swap behavior (a PUT carrying a
//! stale or missing `sha`) surfaces as a revision conflict.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{AppError, Result};
use crate::storage::{RemoteStore, Revision};

const ACCEPT: &str = "application/vnd.github.v3+json";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Store backend committing into a GitHub repository.
pub struct GitHubStore {
    client: Client,
    api_base: String,
    repo: String,
    branch: String,
    token: String,
}

/// Subset of a contents API response we care about.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    content: Option<String>,
}

/// PUT body for creating or updating a file.
#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubStore {
    /// Create a store for `owner/name` on the given branch.
    pub fn new(
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        api_base: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
        })
    }

    /// Build a store from config plus environment.
    ///
    /// The token comes from `GH_TOKEN`; `TARGET_REPO` overrides the
    /// configured repository when set.
    pub fn from_env(remote: &RemoteConfig, user_agent: &str) -> Result<Self> {
        let token = std::env::var("GH_TOKEN")
            .map_err(|_| AppError::config("GH_TOKEN environment variable is not set"))?;
        let repo = std::env::var("TARGET_REPO").unwrap_or_else(|_| remote.repo.clone());
        if repo.trim().is_empty() {
            return Err(AppError::config(
                "no target repository: set remote.repo or TARGET_REPO",
            ));
        }
        Self::new(repo, &remote.branch, token, &remote.api_base, user_agent)
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_base, self.repo, path)
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }

    /// Fetch file metadata and inline content, `None` on 404.
    async fn get_contents(&self, path: &str) -> Result<Option<ContentsResponse>> {
        let response = self
            .client
            .get(self.contents_url(path))
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, ACCEPT)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(AppError::store(
                path,
                format!("contents request failed with status {status}"),
            )),
        }
    }
}

#[async_trait]
impl RemoteStore for GitHubStore {
    async fn revision(&self, path: &str) -> Result<Option<Revision>> {
        Ok(self
            .get_contents(path)
            .await?
            .map(|contents| Revision::new(contents.sha)))
    }

    async fn read(&self, path: &str) -> Result<Option<(Vec<u8>, Revision)>> {
        let Some(contents) = self.get_contents(path).await? else {
            return Ok(None);
        };
        let Some(encoded) = contents.content else {
            return Err(AppError::store(path, "contents response had no inline content"));
        };

        // The API wraps base64 at 60 columns; strip the line breaks first.
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = BASE64
            .decode(compact.as_bytes())
            .map_err(|e| AppError::store(path, format!("invalid base64 content: {e}")))?;

        Ok(Some((bytes, Revision::new(contents.sha))))
    }

    async fn write(
        &self,
        path: &str,
        bytes: &[u8],
        message: &str,
        expected: Option<&Revision>,
    ) -> Result<()> {
        let body = PutBody {
            message,
            content: BASE64.encode(bytes),
            branch: &self.branch,
            sha: expected.map(Revision::as_str),
        };

        let response = self
            .client
            .put(self.contents_url(path))
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, ACCEPT)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                log::info!("Committed {}", path);
                Ok(())
            }
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(AppError::RevisionConflict { path: path.into() })
            }
            status => Err(AppError::store(
                path,
                format!("write failed with status {status}"),
            )),
        }
    }
}
