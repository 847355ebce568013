use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::core::error::UpdateError;
use crate::core::remote::{RemoteAuthority, RemoteVersionDescriptor};
use crate::core::store::{self, LocalVersionStore};
use crate::core::version::is_newer;

/// Outcome of one update check. Consumed immediately by the shell; only the
/// check timestamp is persisted.
#[derive(Debug, Clone, Default)]
pub struct UpdateDecision {
    pub launcher_update: Option<RemoteVersionDescriptor>,
    pub content_update: Option<RemoteVersionDescriptor>,
    /// Set only when both authority calls failed.
    pub error_message: Option<String>,
}

impl UpdateDecision {
    pub fn any_update_available(&self) -> bool {
        self.launcher_update.is_some() || self.content_update.is_some()
    }
}

/// Ask the remote authority for the latest launcher and content versions
/// and compare against what is installed locally.
///
/// The two network calls run concurrently; each failure is contained to its
/// own half so a broken modpack endpoint cannot hide a launcher update (and
/// vice versa). Never returns an error — a flaky update server must not
/// block startup.
pub async fn check_for_updates(
    authority: &dyn RemoteAuthority,
    version_store: &LocalVersionStore,
    install_root: &Path,
) -> UpdateDecision {
    let mut record = version_store.load().await;
    // The running binary is authoritative for the launcher version: after a
    // self-replacement the record on disk still carries the old one. Use
    // the embedded version for the comparison and reconcile the record.
    let running_launcher = env!("CARGO_PKG_VERSION");
    record.launcher_version = running_launcher.to_string();
    // The install marker is authoritative for the pack (wiping the install
    // root resets it); the version record is the fallback.
    let installed_content = match store::load_install_marker(install_root).await {
        Some(marker) => marker.version,
        None => record.content_pack_version.clone(),
    };

    let (launcher_result, content_result) =
        tokio::join!(authority.latest_launcher(), authority.latest_content());

    let launcher_failed = launcher_result.is_err();
    let content_failed = content_result.is_err();

    let launcher_update = accept_if_newer("launcher", launcher_result, running_launcher);
    let content_update = accept_if_newer("content pack", content_result, &installed_content);

    // The check happened; remember when, whatever the outcome.
    record.last_update_check = Utc::now();
    if let Err(e) = version_store.save(&record).await {
        warn!("Could not persist last-check timestamp: {e}");
    }

    let error_message = if launcher_failed && content_failed {
        Some("Update server unreachable".to_string())
    } else {
        None
    };

    UpdateDecision {
        launcher_update,
        content_update,
        error_message,
    }
}

fn accept_if_newer(
    what: &str,
    result: Result<Option<RemoteVersionDescriptor>, UpdateError>,
    current: &str,
) -> Option<RemoteVersionDescriptor> {
    match result {
        Ok(Some(descriptor)) if is_newer(&descriptor.version, current) => {
            info!(
                "New {what} version available: {} (installed: {current})",
                descriptor.version
            );
            Some(descriptor)
        }
        Ok(Some(descriptor)) => {
            info!("{what} is up to date ({current} >= {})", descriptor.version);
            None
        }
        Ok(None) => {
            info!("Authority reported no {what} release");
            None
        }
        Err(e) => {
            // Transient by policy: this half simply has no update today.
            warn!("{what} version check failed: {e}");
            None
        }
    }
}
