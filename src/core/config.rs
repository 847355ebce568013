use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

const APP_DIR_NAME: &str = "CraftSync";
const CONFIG_FILE: &str = "updater_config.json";
const VERSION_FILE: &str = "version.json";

const DEFAULT_API_BASE: &str = "https://api.craftsync.app/api";

/// Updater configuration. Loaded fresh at the start of every operation so
/// an install-root change in the settings UI takes effect without a
/// restart — nothing here is cached process-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// Base URL of the remote authority, including the `/api` prefix.
    pub api_base_url: String,
    /// Directory containing the game runtime, content pack and user files.
    pub install_root: PathBuf,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            install_root: data_dir().join("game"),
        }
    }
}

impl UpdaterConfig {
    /// Read the configuration from disk, falling back to defaults when the
    /// file is absent or unreadable.
    pub fn load() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Corrupt {CONFIG_FILE} at {:?}: {e}", path);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Root URL for download assets: the API base with its `/api` suffix
    /// stripped. Relative download URLs from the authority are resolved
    /// against this.
    pub fn asset_base(&self) -> String {
        self.api_base_url
            .trim_end_matches('/')
            .trim_end_matches("/api")
            .to_string()
    }

    /// Path of the persisted launcher/content version record.
    pub fn version_file(&self) -> PathBuf {
        data_dir().join(VERSION_FILE)
    }
}

fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

/// Launcher data directory (`<platform data dir>/CraftSync`).
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
