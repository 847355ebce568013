use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::core::error::{UpdateError, UpdateResult};

/// User-mutable paths copied aside before a full update.
const BACKUP_ITEMS: [&str; 2] = ["config", "options.txt"];

/// Copy the user-mutable paths into `backups/<timestamp>` under the
/// install root. Items that do not exist are skipped. Retention of old
/// backups is the user's business; nothing here deletes them.
///
/// Synchronous on purpose — called through `spawn_blocking` alongside the
/// extraction work.
pub fn create_backup(install_root: &Path) -> UpdateResult<PathBuf> {
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let backup_dir = install_root.join("backups").join(stamp);
    std::fs::create_dir_all(&backup_dir).map_err(|source| UpdateError::Io {
        path: backup_dir.clone(),
        source,
    })?;

    for item in BACKUP_ITEMS {
        let source_path = install_root.join(item);
        let dest_path = backup_dir.join(item);

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else if source_path.is_file() {
            std::fs::copy(&source_path, &dest_path).map_err(|source| UpdateError::Io {
                path: dest_path.clone(),
                source,
            })?;
        }
    }

    info!("Backed up user data to {:?}", backup_dir);
    Ok(backup_dir)
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> UpdateResult<()> {
    std::fs::create_dir_all(destination).map_err(|e| UpdateError::Io {
        path: destination.to_path_buf(),
        source: e,
    })?;

    for entry in std::fs::read_dir(source).map_err(|e| UpdateError::Io {
        path: source.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| UpdateError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path).map_err(|e| UpdateError::Io {
                path: dst_path,
                source: e,
            })?;
        }
    }

    Ok(())
}
