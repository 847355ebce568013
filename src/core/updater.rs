use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::checker::{self, UpdateDecision};
use crate::core::config::UpdaterConfig;
use crate::core::content::{ContentUpdater, UpdateScope};
use crate::core::error::UpdateResult;
use crate::core::http;
use crate::core::progress::ProgressReporter;
use crate::core::remote::{HttpRemoteAuthority, RemoteVersionDescriptor};
use crate::core::selfupdate::SelfUpdater;
use crate::core::store::LocalVersionStore;

/// Entry point for the shell (GUI or CLI). Explicit context instead of
/// process-wide singletons: configuration is re-read at the start of every
/// operation, so an install-root change applies to the next call without
/// invalidating any hidden cache.
///
/// Callers serialize update operations themselves — one content or
/// launcher update at a time.
pub struct Updater {
    api_client: Client,
    download_client: Client,
}

impl Updater {
    pub fn new() -> UpdateResult<Self> {
        Ok(Self {
            api_client: http::build_api_client()?,
            download_client: http::build_download_client()?,
        })
    }

    /// Query the remote authority and compare against the local state.
    /// Safe to call at every startup; never fails.
    pub async fn check_for_updates(&self) -> UpdateDecision {
        let config = UpdaterConfig::load();
        let authority = HttpRemoteAuthority::new(self.api_client.clone(), &config.api_base_url);
        let store = LocalVersionStore::new(config.version_file());

        checker::check_for_updates(&authority, &store, &config.install_root).await
    }

    /// Apply a confirmed content-pack update. Call once per confirmation.
    pub async fn update_content(
        &self,
        descriptor: &RemoteVersionDescriptor,
        scope: UpdateScope,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> bool {
        let config = UpdaterConfig::load();
        let updater = ContentUpdater::new(
            self.download_client.clone(),
            config.asset_base(),
            config.install_root.clone(),
            LocalVersionStore::new(config.version_file()),
        );

        updater
            .update_content(descriptor, scope, progress, cancel)
            .await
    }

    /// Apply a confirmed launcher update. Does not return on success: the
    /// process is replaced and relaunched. Callers must have no unsaved
    /// state. `false` means the update failed and the process keeps
    /// running.
    pub async fn update_launcher(
        &self,
        descriptor: &RemoteVersionDescriptor,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> bool {
        let config = UpdaterConfig::load();
        let self_updater = match SelfUpdater::new(self.download_client.clone(), config.asset_base())
        {
            Ok(updater) => updater,
            Err(e) => {
                warn!("Cannot locate the running executable: {e}");
                progress.report(&format!("Failed: {e}"), 0.0);
                return false;
            }
        };

        match self_updater
            .update_launcher(descriptor, progress, cancel)
            .await
        {
            Some(pending) => pending.commit(),
            None => false,
        }
    }
}
