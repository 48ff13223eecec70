use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::NetworkSettings;
use crate::net::{build_http_client, ProxyMode, GITHUB_TIMEOUT};
use crate::tooling::errors::excerpt;
use crate::RelayError;

use super::download::{download_with_retry, AssetRequest, RetryPolicy};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const ASSETS_PER_PAGE: usize = 100;
/// GitHub allows at most 1000 assets per release.
const MAX_ASSET_PAGES: usize = 10;

/// An `owner/name` repository reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        let trimmed = raw.trim().trim_end_matches('/');
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if is_slug_part(owner) && is_slug_part(name) => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(RelayError::config(
                format!("repository must look like owner/name, got `{raw}`"),
                "Pass --repo owner/name or export GITHUB_REPO=owner/name.",
            )),
        }
    }
}

fn is_slug_part(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && part
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A validated repository plus the credentials used to read it.
#[derive(Clone)]
pub struct GithubTarget {
    pub repo: RepoSlug,
    pub token: String,
    pub api_url: String,
}

impl fmt::Debug for GithubTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubTarget")
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub html_url: String,
    pub assets_url: String,
}

impl ReleaseInfo {
    /// Release title, falling back to the tag when the release is unnamed.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.tag_name)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReleaseAsset {
    pub name: String,
    /// API endpoint that serves the raw bytes with `Accept: application/octet-stream`.
    #[serde(rename = "url")]
    pub download_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at: Option<String>,
}

pub struct GithubClient {
    http: Client,
    target: GithubTarget,
    retry: RetryPolicy,
    progress: bool,
}

impl GithubClient {
    pub fn new(target: GithubTarget, network: NetworkSettings) -> Result<Self, RelayError> {
        let http = build_http_client(GITHUB_TIMEOUT, ProxyMode::from_flag(network.keep_proxies))
            .map_err(|err| RelayError::ReleaseQuery {
                repo: target.repo.to_string(),
                message: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self {
            http,
            target,
            retry: RetryPolicy::default(),
            progress: false,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    #[must_use]
    pub fn target(&self) -> &GithubTarget {
        &self.target
    }

    fn query_error(&self, message: impl Into<String>) -> RelayError {
        RelayError::ReleaseQuery {
            repo: self.target.repo.to_string(),
            message: message.into(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RelayError> {
        tracing::debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.target.token)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .map_err(|err| self.query_error(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RelayError::NotFound {
                repo: self.target.repo.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(self.query_error(format!("HTTP {status}: {}", excerpt(&body))));
        }
        response
            .json::<T>()
            .map_err(|err| self.query_error(format!("invalid response from {url}: {err}")))
    }

    /// Resolves the release GitHub marks as latest.
    pub fn latest_release(&self) -> Result<ReleaseInfo, RelayError> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.target.api_url, self.target.repo.owner, self.target.repo.name
        );
        let release: ReleaseInfo = self.get_json(&url)?;
        tracing::info!(
            repo = %self.target.repo,
            tag = %release.tag_name,
            "resolved latest release"
        );
        Ok(release)
    }

    /// Lists every asset of `release`, following `per_page` pagination.
    pub fn release_assets(&self, release: &ReleaseInfo) -> Result<Vec<ReleaseAsset>, RelayError> {
        let base = Url::parse(&release.assets_url).map_err(|err| {
            self.query_error(format!("invalid assets_url {}: {err}", release.assets_url))
        })?;
        let mut assets = Vec::new();
        for page in 1..=MAX_ASSET_PAGES {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair("per_page", &ASSETS_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<ReleaseAsset> = self.get_json(url.as_str())?;
            let short_page = batch.len() < ASSETS_PER_PAGE;
            assets.extend(batch);
            if short_page {
                break;
            }
            if page == MAX_ASSET_PAGES {
                tracing::warn!(pages = page, "stopped listing assets at the page limit");
            }
        }
        tracing::debug!(count = assets.len(), "listed release assets");
        Ok(assets)
    }

    pub fn list_release_assets(&self) -> Result<(ReleaseInfo, Vec<ReleaseAsset>), RelayError> {
        let release = self.latest_release()?;
        let assets = self.release_assets(&release)?;
        Ok((release, assets))
    }

    /// Downloads `asset` into `dir`, retrying transient failures.
    pub fn download(&self, asset: &ReleaseAsset, dir: &Path) -> Result<PathBuf, RelayError> {
        let request = AssetRequest {
            name: &asset.name,
            url: &asset.download_url,
            token: &self.target.token,
            size: Some(asset.size),
        };
        download_with_retry(&self.http, &request, dir, &self.retry, self.progress)
    }
}
