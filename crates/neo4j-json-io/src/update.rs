//! Best-effort check for newer releases.
//!
//! Nothing here can fail an export: every error ends up as a `debug!` line
//! and the check reports "no update". The exporter never depends on this
//! module; only the binary calls it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Release feed of the project.
pub const RELEASE_URL: &str = "https://api.github.com/repos/BioDWH2/Neo4j-Json-IO/releases";

/// Release assets of this tool are named `neo4j-json-io-<tag>...`.
pub const ASSET_PREFIX: &str = "neo4j-json-io-";

const FEED_TIMEOUT: Duration = Duration::from_secs(5);

/// A `major.minor.patch` version; missing components count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl Version {
    /// Parses `1`, `1.2`, `1.2.3`, optionally prefixed with `v`.
    /// Anything else yields `None`.
    #[must_use]
    pub fn try_parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text.strip_prefix('v').unwrap_or(text);

        let mut parts = [0u32; 3];
        let mut count = 0;
        for part in text.split('.') {
            if count == parts.len() {
                return None;
            }
            parts[count] = part.parse().ok()?;
            count += 1;
        }

        Some(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version of the running binary, from the package manifest.
#[must_use]
pub fn current_version() -> Option<Version> {
    Version::try_parse(env!("CARGO_PKG_VERSION"))
}

/// A published release.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Git tag, e.g. `v1.2.0`.
    pub tag_name: String,
    /// Downloadable assets.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// File name.
    pub name: String,
    /// Public download URL.
    pub browser_download_url: String,
}

/// A newer release than the running one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    /// Version of the release.
    pub version: Version,
    /// Where to download it.
    pub download_url: String,
}

/// Source of published releases.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Fetch all published releases.
    async fn releases(&self) -> Result<Vec<Release>>;
}

/// Release feed backed by the GitHub releases API.
pub struct GithubReleaseFeed {
    url: String,
    client: Client,
}

impl GithubReleaseFeed {
    /// Feed of this project.
    #[must_use]
    pub fn new() -> Self {
        Self::with_url(RELEASE_URL)
    }

    /// Feed at a custom URL.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        // GitHub rejects requests without a User-Agent.
        let client = Client::builder()
            .timeout(FEED_TIMEOUT)
            .user_agent(concat!("neo4j-json-io/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            url: url.into(),
            client,
        }
    }
}

impl Default for GithubReleaseFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleaseFeed {
    async fn releases(&self) -> Result<Vec<Release>> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Connection(format!(
                "Release feed answered {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

/// Picks the newest release that ships an asset of this tool.
///
/// A release qualifies when its tag parses as a version and it has an asset
/// named `neo4j-json-io-<tag>...`; among qualifying releases the highest
/// version wins.
#[must_use]
pub fn newest_release(releases: &[Release]) -> Option<UpdateNotice> {
    let mut best: Option<UpdateNotice> = None;

    for release in releases {
        let Some(version) = Version::try_parse(&release.tag_name) else {
            continue;
        };
        let expected = format!("{}{}", ASSET_PREFIX, release.tag_name).to_lowercase();
        let Some(asset) = release
            .assets
            .iter()
            .find(|a| a.name.to_lowercase().starts_with(&expected))
        else {
            continue;
        };

        if best.as_ref().map_or(true, |b| version > b.version) {
            best = Some(UpdateNotice {
                version,
                download_url: asset.browser_download_url.clone(),
            });
        }
    }

    best
}

/// Returns the newest release if it is newer than `current`.
///
/// An unknown current version counts as older than any release.
#[must_use]
pub fn select_update(current: Option<Version>, releases: &[Release]) -> Option<UpdateNotice> {
    let candidate = newest_release(releases)?;
    match current {
        Some(current) if current >= candidate.version => None,
        _ => Some(candidate),
    }
}

/// Queries `feed` and returns a notice if a newer release exists.
/// Feed failures are swallowed.
pub async fn check_for_update(
    feed: &dyn ReleaseFeed,
    current: Option<Version>,
) -> Option<UpdateNotice> {
    match feed.releases().await {
        Ok(releases) => select_update(current, &releases),
        Err(e) => {
            debug!("Update check skipped: {}", e);
            None
        }
    }
}

/// Logs an update notice.
pub fn log_notice(notice: &UpdateNotice) {
    info!("=======================================");
    info!(
        "New version {} of neo4j-json-io is available at:",
        notice.version
    );
    info!("{}", notice.download_url);
    info!("=======================================");
}
