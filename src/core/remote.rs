use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::core::error::{UpdateError, UpdateResult};

/// Latest-version metadata for one updatable component, as advertised by
/// the remote authority. Only the accepted version number ever gets
/// persisted; the rest is consumed within a single check/update cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersionDescriptor {
    pub version: String,
    pub download_url: String,
    pub file_size: u64,
    pub release_date: Option<DateTime<Utc>>,
    pub changelog: Vec<String>,
    /// Launcher updates only: the shell must not let the user skip these.
    pub is_required: bool,
    /// Optional hex SHA-256 of the download.
    pub sha256: Option<String>,
    /// Content packs only: the game/loader versions the pack targets.
    pub minecraft_version: Option<String>,
    pub loader_version: Option<String>,
}

// ── Wire models ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LauncherVersionResponse {
    success: bool,
    #[serde(default)]
    version: String,
    #[serde(default)]
    release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    download_url: String,
    #[serde(default)]
    changelog: Vec<String>,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    file_size: u64,
    #[serde(default)]
    sha256_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModpackVersionResponse {
    success: bool,
    #[serde(default)]
    version: String,
    #[serde(default)]
    download_url: String,
    #[serde(default)]
    file_size: u64,
    #[serde(default)]
    release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    minecraft: Option<String>,
    #[serde(default)]
    fabric: Option<String>,
    #[serde(default)]
    changelog: Vec<String>,
    #[serde(default)]
    sha256_hash: Option<String>,
}

impl From<LauncherVersionResponse> for RemoteVersionDescriptor {
    fn from(r: LauncherVersionResponse) -> Self {
        Self {
            version: r.version,
            download_url: r.download_url,
            file_size: r.file_size,
            release_date: r.release_date,
            changelog: r.changelog,
            is_required: r.is_required,
            sha256: r.sha256_hash,
            minecraft_version: None,
            loader_version: None,
        }
    }
}

impl From<ModpackVersionResponse> for RemoteVersionDescriptor {
    fn from(r: ModpackVersionResponse) -> Self {
        Self {
            version: r.version,
            download_url: r.download_url,
            file_size: r.file_size,
            release_date: r.release_date,
            changelog: r.changelog,
            is_required: false,
            sha256: r.sha256_hash,
            minecraft_version: r.minecraft,
            loader_version: r.fabric,
        }
    }
}

// ── Authority ───────────────────────────────────────────

/// Source of latest-version metadata. A trait so the update checker can be
/// exercised against an in-memory stub.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// `Ok(None)` when the authority answered but flagged `success=false`.
    async fn latest_launcher(&self) -> UpdateResult<Option<RemoteVersionDescriptor>>;
    async fn latest_content(&self) -> UpdateResult<Option<RemoteVersionDescriptor>>;
}

/// JSON-over-HTTPS implementation against the launcher API.
pub struct HttpRemoteAuthority {
    client: Client,
    api_base: String,
}

impl HttpRemoteAuthority {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/launcher/{path}", self.api_base.trim_end_matches('/'))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> UpdateResult<T> {
        debug!("Requesting {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let raw = response.text().await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl RemoteAuthority for HttpRemoteAuthority {
    async fn latest_launcher(&self) -> UpdateResult<Option<RemoteVersionDescriptor>> {
        let response: LauncherVersionResponse = self.get_json(&self.endpoint("version")).await?;
        if !response.success {
            debug!("Launcher version endpoint answered success=false");
            return Ok(None);
        }
        Ok(Some(response.into()))
    }

    async fn latest_content(&self) -> UpdateResult<Option<RemoteVersionDescriptor>> {
        let response: ModpackVersionResponse =
            self.get_json(&self.endpoint("modpack/version")).await?;
        if !response.success {
            debug!("Modpack version endpoint answered success=false");
            return Ok(None);
        }
        Ok(Some(response.into()))
    }
}

/// Resolve a possibly-relative download URL against the authority's asset
/// base. Absolute URLs pass through untouched.
pub fn resolve_download_url(asset_base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            asset_base.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

/// File name portion of a download URL, used for the install marker.
pub fn file_name_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string()
}
