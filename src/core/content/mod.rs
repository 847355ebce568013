// ─── Content-Pack Updater ───
// Downloads the content-pack archive, applies the entries selected by the
// update scope and records the installed version. Backup (full scope only)
// always completes before extraction; the version record is written only
// after extraction succeeded.

pub mod backup;
pub mod scope;

use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::downloader::{download_to_file, TempDownload};
use crate::core::error::{UpdateError, UpdateResult};
use crate::core::progress::ProgressReporter;
use crate::core::remote::{file_name_from_url, resolve_download_url, RemoteVersionDescriptor};
use crate::core::store::{self, ContentInstallMarker, LocalVersionStore};

pub use scope::UpdateScope;

/// One content-pack update operation. Constructed fresh per call with the
/// install root read from configuration at that moment.
pub struct ContentUpdater {
    client: Client,
    asset_base: String,
    install_root: PathBuf,
    version_store: LocalVersionStore,
}

impl ContentUpdater {
    pub fn new(
        client: Client,
        asset_base: impl Into<String>,
        install_root: PathBuf,
        version_store: LocalVersionStore,
    ) -> Self {
        Self {
            client,
            asset_base: asset_base.into(),
            install_root,
            version_store,
        }
    }

    /// Apply a confirmed content update. Progress runs 0–50 % during the
    /// download and 50–100 % while applying. Errors never escape: the
    /// outcome is `true`/`false` plus messages through the reporter.
    pub async fn update_content(
        &self,
        descriptor: &RemoteVersionDescriptor,
        scope: UpdateScope,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> bool {
        match self.run(descriptor, scope, progress, cancel).await {
            Ok(()) => {
                info!(
                    "Content pack updated to {} (scope: {scope})",
                    descriptor.version
                );
                progress.report("Update complete", 100.0);
                true
            }
            Err(e) => {
                warn!("Content update to {} failed: {e}", descriptor.version);
                progress.report(&format!("Error: {e}"), 0.0);
                false
            }
        }
    }

    async fn run(
        &self,
        descriptor: &RemoteVersionDescriptor,
        scope: UpdateScope,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> UpdateResult<()> {
        // Fail fast before anything touches the disk.
        self.ensure_free_space(scope.required_bytes(descriptor.file_size))?;

        let url = resolve_download_url(&self.asset_base, &descriptor.download_url);
        debug!("Downloading content pack from {url}");
        progress.report("Downloading update", 0.0);

        let mut archive = TempDownload::new("craftsync-modpack", "zip");
        {
            let reporter = progress.clone();
            download_to_file(
                &self.client,
                &url,
                archive.path(),
                Some(descriptor.file_size),
                cancel,
                move |done, total| {
                    if let Some(total) = total.filter(|t| *t > 0) {
                        let percent = done as f64 / total as f64 * 50.0;
                        reporter.report("Downloading update", percent);
                    }
                },
            )
            .await?;
        }

        progress.report("Validating archive", 50.0);
        validate_archive(archive.path()).await?;

        if scope == UpdateScope::Full {
            progress.report("Backing up user data", 50.0);
            let install_root = self.install_root.clone();
            tokio::task::spawn_blocking(move || backup::create_backup(&install_root))
                .await
                .map_err(|e| UpdateError::Other(format!("Backup task panicked: {e}")))??;
        }

        progress.report("Extracting files", 50.0);
        let applied = {
            let archive_path = archive.path().to_path_buf();
            let install_root = self.install_root.clone();
            let reporter = progress.clone();
            let result = tokio::task::spawn_blocking(move || {
                extract_archive(&archive_path, &install_root, scope, &reporter)
            })
            .await
            .map_err(|e| UpdateError::Other(format!("Extraction task panicked: {e}")))?;

            match result {
                Ok(applied) => applied,
                Err((0, e)) => return Err(e),
                Err((applied, e)) => {
                    // Some entries already landed; keep the archive around so
                    // the failure can be inspected and the update re-run.
                    archive.keep();
                    warn!("Partial extraction, archive retained at {:?}", archive.path());
                    return Err(UpdateError::PartialExtraction {
                        applied,
                        reason: e.to_string(),
                    });
                }
            }
        };
        debug!("Applied {applied} archive entries");

        store::write_install_marker(
            &self.install_root,
            &ContentInstallMarker {
                version: descriptor.version.clone(),
                file_name: file_name_from_url(&url),
                installed_at: Utc::now(),
                file_size: descriptor.file_size,
            },
        )
        .await?;

        let mut record = self.version_store.load().await;
        record.content_pack_version = descriptor.version.clone();
        self.version_store.save(&record).await?;

        // Temp archive removed by the guard on scope exit.
        Ok(())
    }

    fn ensure_free_space(&self, required: u64) -> UpdateResult<()> {
        let Some(available) = available_space(&self.install_root) else {
            debug!("Free-space probe failed for {:?}, skipping check", self.install_root);
            return Ok(());
        };
        if available < required {
            return Err(UpdateError::InsufficientDiskSpace {
                required,
                available,
            });
        }
        Ok(())
    }
}

/// Free bytes on the disk holding `path`, picking the mount point with the
/// longest matching prefix. `None` when the path maps to no known disk.
fn available_space(path: &Path) -> Option<u64> {
    let probe = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());

    let disks = sysinfo::Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|disk| probe.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

/// Cheap well-formedness check: the file must open as a zip archive.
async fn validate_archive(path: &Path) -> UpdateResult<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&path).map_err(|source| UpdateError::Io {
            path: path.clone(),
            source,
        })?;
        zip::ZipArchive::new(file)
            .map_err(|e| UpdateError::CorruptArchive(format!("downloaded file corrupted: {e}")))?;
        Ok(())
    })
    .await
    .map_err(|e| UpdateError::Other(format!("Validation task panicked: {e}")))?
}

/// Apply the archive entries selected by `scope` under the install root,
/// overwriting existing files. Returns the number of entries applied; on
/// failure, how many were applied before the error.
fn extract_archive(
    archive_path: &Path,
    install_root: &Path,
    scope: UpdateScope,
    progress: &ProgressReporter,
) -> Result<u64, (u64, UpdateError)> {
    let mut applied: u64 = 0;
    let result = (|| -> UpdateResult<()> {
        let file = std::fs::File::open(archive_path).map_err(|source| UpdateError::Io {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(file)?;
        let total = archive.len().max(1);

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();

            let Some(relative) = entry.enclosed_name() else {
                // Hostile or malformed path; never let it escape the root.
                warn!("Skipping zip entry with unsafe path: {name}");
                continue;
            };

            if scope.applies_to(&name) {
                let dest = install_root.join(&relative);
                if name.ends_with('/') {
                    std::fs::create_dir_all(&dest).map_err(|source| UpdateError::Io {
                        path: dest,
                        source,
                    })?;
                } else {
                    if let Some(parent) = dest.parent() {
                        std::fs::create_dir_all(parent).map_err(|source| UpdateError::Io {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                    }
                    let mut out =
                        std::fs::File::create(&dest).map_err(|source| UpdateError::Io {
                            path: dest.clone(),
                            source,
                        })?;
                    std::io::copy(&mut entry, &mut out).map_err(|source| UpdateError::Io {
                        path: dest,
                        source,
                    })?;
                }
                applied += 1;
            }

            let percent = 50.0 + (index + 1) as f64 * 50.0 / total as f64;
            progress.report(&format!("Extracting {name}"), percent);
        }

        Ok(())
    })();

    match result {
        Ok(()) => Ok(applied),
        Err(e) => Err((applied, e)),
    }
}
