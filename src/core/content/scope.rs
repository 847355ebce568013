use serde::{Deserialize, Serialize};

/// Which part of the content pack a single update applies.
///
/// Chosen by the user per update, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScope {
    ModsOnly,
    ModsAndResources,
    Full,
}

impl UpdateScope {
    /// Whether an archive entry at `entry_path` (relative, any separator,
    /// any case) should be applied under this scope.
    ///
    /// `Full` extracts everything except user-owned data: previous backups,
    /// save directories, `options.txt` and `servers.dat` must survive an
    /// update untouched.
    pub fn applies_to(self, entry_path: &str) -> bool {
        let normalized = entry_path.replace('\\', "/").to_ascii_lowercase();

        match self {
            UpdateScope::ModsOnly => normalized.starts_with("mods/"),
            UpdateScope::ModsAndResources => {
                normalized.starts_with("mods/")
                    || normalized.starts_with("resourcepacks/")
                    || normalized.starts_with("shaderpacks/")
            }
            UpdateScope::Full => {
                !normalized.starts_with("backups/")
                    && !normalized.starts_with("saves/")
                    && !normalized.contains("/saves/")
                    && normalized != "options.txt"
                    && normalized != "servers.dat"
            }
        }
    }

    /// Bytes of free space to demand before downloading. The authority
    /// advertises the full archive size; partial scopes apply less of it.
    pub fn required_bytes(self, full_size: u64) -> u64 {
        // Divide first: the declared size may be huge and must not overflow.
        match self {
            UpdateScope::ModsOnly => full_size / 10 * 6,
            UpdateScope::ModsAndResources => full_size / 10 * 8,
            UpdateScope::Full => full_size,
        }
    }
}

impl std::fmt::Display for UpdateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UpdateScope::ModsOnly => "mods only",
            UpdateScope::ModsAndResources => "mods and resources",
            UpdateScope::Full => "full",
        };
        f.write_str(name)
    }
}
