use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{UpdateError, UpdateResult};

/// Marker file the content updater writes into the install root.
const INSTALL_MARKER_FILE: &str = "modpack-version.json";

/// Last-known installed versions, persisted in the launcher data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalVersionRecord {
    pub launcher_version: String,
    pub content_pack_version: String,
    pub last_update_check: DateTime<Utc>,
}

impl Default for LocalVersionRecord {
    fn default() -> Self {
        Self {
            launcher_version: env!("CARGO_PKG_VERSION").to_string(),
            content_pack_version: "0.0.0".to_string(),
            last_update_check: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Written next to the content pack after a successful update; separate
/// from the version record so a user wiping the install root also resets
/// the recorded pack version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInstallMarker {
    pub version: String,
    pub file_name: String,
    pub installed_at: DateTime<Utc>,
    pub file_size: u64,
}

/// Owns the persisted version record file. All writes are atomic
/// (temp file in the same directory, then rename) so a crash mid-write
/// never corrupts the previous valid record.
pub struct LocalVersionStore {
    path: PathBuf,
}

impl LocalVersionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the record. Missing file, missing fields or malformed JSON all
    /// yield the default record — startup must never fail on this file.
    pub async fn load(&self) -> LocalVersionRecord {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Corrupt version record at {:?}: {e}", self.path);
                    LocalVersionRecord::default()
                }
            },
            Err(_) => LocalVersionRecord::default(),
        }
    }

    pub async fn save(&self, record: &LocalVersionRecord) -> UpdateResult<()> {
        let json = serde_json::to_string_pretty(record)?;
        write_atomic(&self.path, json.as_bytes()).await?;
        debug!("Saved version record to {:?}", self.path);
        Ok(())
    }
}

/// Installed content-pack version from the marker file, `"0.0.0"` when the
/// marker is absent or unreadable.
pub async fn installed_content_version(install_root: &Path) -> String {
    load_install_marker(install_root)
        .await
        .map(|m| m.version)
        .unwrap_or_else(|| "0.0.0".to_string())
}

pub async fn load_install_marker(install_root: &Path) -> Option<ContentInstallMarker> {
    let path = install_root.join(INSTALL_MARKER_FILE);
    let raw = tokio::fs::read_to_string(&path).await.ok()?;
    match serde_json::from_str(&raw) {
        Ok(marker) => Some(marker),
        Err(e) => {
            warn!("Corrupt install marker at {:?}: {e}", path);
            None
        }
    }
}

pub async fn write_install_marker(
    install_root: &Path,
    marker: &ContentInstallMarker,
) -> UpdateResult<()> {
    let path = install_root.join(INSTALL_MARKER_FILE);
    let json = serde_json::to_string_pretty(marker)?;
    write_atomic(&path, json.as_bytes()).await
}

/// Write via a uniquely named sibling temp file plus rename, creating the
/// parent directory on demand. A concurrent reader sees either the old
/// file or the new one, never a half-written mix.
async fn write_atomic(path: &Path, bytes: &[u8]) -> UpdateResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| UpdateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|source| UpdateError::Io {
            path: tmp.clone(),
            source,
        })?;

    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(UpdateError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVersionStore::new(dir.path().join("version.json"));
        let record = store.load().await;
        assert_eq!(record.content_pack_version, "0.0.0");
        assert_eq!(record.launcher_version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn load_corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let record = LocalVersionStore::new(path).load().await;
        assert_eq!(record.content_pack_version, "0.0.0");
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVersionStore::new(dir.path().join("nested").join("version.json"));

        let record = LocalVersionRecord {
            launcher_version: "1.4.2".into(),
            content_pack_version: "2.1.0".into(),
            last_update_check: Utc::now(),
        };
        store.save(&record).await.unwrap();
        assert_eq!(store.load().await, record);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVersionStore::new(dir.path().join("version.json"));
        store.save(&LocalVersionRecord::default()).await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["version.json"]);
    }

    #[tokio::test]
    async fn install_marker_round_trips_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(installed_content_version(dir.path()).await, "0.0.0");

        let marker = ContentInstallMarker {
            version: "2.0.0".into(),
            file_name: "modpack-2.0.0.zip".into(),
            installed_at: Utc::now(),
            file_size: 1024,
        };
        write_install_marker(dir.path(), &marker).await.unwrap();
        assert_eq!(load_install_marker(dir.path()).await, Some(marker));
        assert_eq!(installed_content_version(dir.path()).await, "2.0.0");
    }
}
