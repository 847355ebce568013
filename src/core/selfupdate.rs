// ─── Launcher Self-Update ───
// Downloads the new launcher binary next to the running one, verifies its
// digest, then hands replacement to a small helper script: the running
// process cannot overwrite its own executable while it holds the file lock.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::downloader::download_to_file;
use crate::core::error::{UpdateError, UpdateResult};
use crate::core::progress::ProgressReporter;
use crate::core::remote::{resolve_download_url, RemoteVersionDescriptor};

/// Where a self-update currently stands. Reported through the progress
/// callback; `Installing` cannot fail back to the caller because the
/// process exits before a result could be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    Downloading,
    Verifying,
    Installing,
    Relaunching,
    Failed,
}

impl std::fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UpdatePhase::Idle => "Idle",
            UpdatePhase::Downloading => "Downloading",
            UpdatePhase::Verifying => "Verifying",
            UpdatePhase::Installing => "Installing",
            UpdatePhase::Relaunching => "Relaunching",
            UpdatePhase::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// A fully prepared self-replacement: new binary verified and in place,
/// helper script written. `commit()` starts the script and exits the
/// process. Dropping the handle instead aborts the replacement, removing
/// both the script and the downloaded binary.
pub struct RelaunchPending {
    script: PathBuf,
    new_exe: PathBuf,
    committed: bool,
}

impl RelaunchPending {
    /// Launch the helper script detached and terminate this process.
    ///
    /// Known weak point: if the script fails to start there is no rollback —
    /// the decision to exit has been made. The failure is logged and the
    /// process exits non-zero so a supervisor can notice.
    pub fn commit(mut self) -> ! {
        self.committed = true;
        match spawn_detached(&self.script) {
            Ok(()) => {
                info!("Relaunch script started, exiting for replacement");
                std::process::exit(0);
            }
            Err(e) => {
                error!("Could not start relaunch script {:?}: {e}", self.script);
                std::process::exit(1);
            }
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script
    }
}

impl Drop for RelaunchPending {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.script);
            let _ = std::fs::remove_file(&self.new_exe);
        }
    }
}

pub struct SelfUpdater {
    client: Client,
    asset_base: String,
    current_exe: PathBuf,
}

impl SelfUpdater {
    pub fn new(client: Client, asset_base: impl Into<String>) -> UpdateResult<Self> {
        let current_exe = std::env::current_exe().map_err(|source| UpdateError::Io {
            path: PathBuf::from("<current exe>"),
            source,
        })?;
        Ok(Self::with_executable(client, asset_base, current_exe))
    }

    /// Build against an explicit executable path instead of the running
    /// binary's.
    pub fn with_executable(
        client: Client,
        asset_base: impl Into<String>,
        current_exe: PathBuf,
    ) -> Self {
        Self {
            client,
            asset_base: asset_base.into(),
            current_exe,
        }
    }

    /// Download and verify the new launcher binary and prepare the
    /// replacement. `None` on any failure (reported through `progress`);
    /// on success the caller must `commit()` the returned handle, which
    /// never returns.
    pub async fn update_launcher(
        &self,
        descriptor: &RemoteVersionDescriptor,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Option<RelaunchPending> {
        match self.run(descriptor, progress, cancel).await {
            Ok(pending) => {
                progress.report(&UpdatePhase::Relaunching.to_string(), 100.0);
                Some(pending)
            }
            Err(e) => {
                warn!("Launcher update to {} failed: {e}", descriptor.version);
                progress.report(&format!("{}: {e}", UpdatePhase::Failed), 0.0);
                None
            }
        }
    }

    async fn run(
        &self,
        descriptor: &RemoteVersionDescriptor,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> UpdateResult<RelaunchPending> {
        let new_exe = sibling_new_path(&self.current_exe);
        let url = resolve_download_url(&self.asset_base, &descriptor.download_url);
        debug!("Downloading launcher {} from {url}", descriptor.version);

        progress.report(&UpdatePhase::Downloading.to_string(), 0.0);
        {
            let reporter = progress.clone();
            download_to_file(
                &self.client,
                &url,
                &new_exe,
                Some(descriptor.file_size),
                cancel,
                move |done, total| {
                    if let Some(total) = total.filter(|t| *t > 0) {
                        let percent = done as f64 / total as f64 * 85.0;
                        reporter.report(&UpdatePhase::Downloading.to_string(), percent);
                    }
                },
            )
            .await?;
        }

        // Verification always happens before the old binary is touched.
        if let Some(expected) = descriptor.sha256.as_deref() {
            progress.report(&UpdatePhase::Verifying.to_string(), 90.0);
            if let Err(e) = verify_sha256(&new_exe, expected).await {
                let _ = tokio::fs::remove_file(&new_exe).await;
                return Err(e);
            }
        }

        progress.report(&UpdatePhase::Installing.to_string(), 95.0);
        let script = match write_relaunch_script(&self.current_exe, &new_exe) {
            Ok(script) => script,
            Err(e) => {
                let _ = tokio::fs::remove_file(&new_exe).await;
                return Err(e);
            }
        };

        Ok(RelaunchPending {
            script,
            new_exe,
            committed: false,
        })
    }
}

/// `launcher.exe` -> `launcher_new.exe`, next to the original so the move
/// stays on one volume.
fn sibling_new_path(exe: &Path) -> PathBuf {
    let stem = exe
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "launcher".to_string());
    let name = match exe.extension() {
        Some(ext) => format!("{stem}_new.{}", ext.to_string_lossy()),
        None => format!("{stem}_new"),
    };
    exe.with_file_name(name)
}

/// Never install an unverified binary: compare the file's SHA-256 against
/// the advertised digest, case-insensitively.
async fn verify_sha256(path: &Path, expected: &str) -> UpdateResult<()> {
    let path = path.to_path_buf();
    let expected = expected.to_string();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).map_err(|source| UpdateError::Io {
            path: path.clone(),
            source,
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let actual = hex::encode(hasher.finalize());
        if actual.eq_ignore_ascii_case(&expected) {
            Ok(())
        } else {
            Err(UpdateError::IntegrityMismatch {
                path,
                expected,
                actual,
            })
        }
    })
    .await
    .map_err(|e| UpdateError::Other(format!("Hashing task panicked: {e}")))?
}

/// Write the self-deleting helper script to the temp directory. It waits a
/// beat for the old process to release its file lock, swaps the binaries,
/// relaunches, then removes itself.
fn write_relaunch_script(current_exe: &Path, new_exe: &Path) -> UpdateResult<PathBuf> {
    let (name, content) = if cfg!(target_os = "windows") {
        let name = format!("craftsync-relaunch-{}.bat", uuid::Uuid::new_v4());
        let content = format!(
            "@echo off\r\n\
             timeout /t 1 /nobreak > nul\r\n\
             del \"{old}\" > nul 2>&1\r\n\
             move /y \"{new}\" \"{old}\" > nul 2>&1\r\n\
             start \"\" \"{old}\"\r\n\
             del \"%~f0\"\r\n",
            old = current_exe.display(),
            new = new_exe.display(),
        );
        (name, content)
    } else {
        let name = format!("craftsync-relaunch-{}.sh", uuid::Uuid::new_v4());
        let content = format!(
            "#!/bin/sh\n\
             sleep 1\n\
             rm -f \"{old}\"\n\
             mv \"{new}\" \"{old}\"\n\
             chmod +x \"{old}\"\n\
             \"{old}\" &\n\
             rm -- \"$0\"\n",
            old = current_exe.display(),
            new = new_exe.display(),
        );
        (name, content)
    };

    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, content).map_err(|source| UpdateError::Io {
        path: path.clone(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).map_err(
            |source| UpdateError::Io {
                path: path.clone(),
                source,
            },
        )?;
    }

    Ok(path)
}

#[cfg(windows)]
fn spawn_detached(script: &Path) -> std::io::Result<()> {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    Command::new("cmd")
        .arg("/C")
        .arg(script)
        .creation_flags(CREATE_NO_WINDOW)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

#[cfg(not(windows))]
fn spawn_detached(script: &Path) -> std::io::Result<()> {
    Command::new("/bin/sh")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::core::testutil::serve_bytes;

    fn descriptor(url: &str, size: u64, sha256: Option<&str>) -> RemoteVersionDescriptor {
        RemoteVersionDescriptor {
            version: "1.5.0".into(),
            download_url: url.into(),
            file_size: size,
            release_date: None,
            changelog: vec![],
            is_required: true,
            sha256: sha256.map(|s| s.to_string()),
            minecraft_version: None,
            loader_version: None,
        }
    }

    fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    #[tokio::test]
    async fn wrong_digest_rejects_and_removes_the_download() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("launcher.exe");
        tokio::fs::write(&exe, b"old binary").await.unwrap();

        let body = b"new binary".to_vec();
        let size = body.len() as u64;
        let url = serve_bytes(body).await;

        let updater =
            SelfUpdater::with_executable(Client::new(), "http://127.0.0.1:1", exe.clone());
        let pending = updater
            .update_launcher(
                &descriptor(&url, size, Some("deadbeef")),
                &ProgressReporter::sink(),
                &CancellationToken::new(),
            )
            .await;

        assert!(pending.is_none());
        assert!(!sibling_new_path(&exe).exists());
        // The old binary is untouched.
        assert_eq!(tokio::fs::read(&exe).await.unwrap(), b"old binary");
    }

    #[tokio::test]
    async fn digest_comparison_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("launcher.exe");
        tokio::fs::write(&exe, b"old binary").await.unwrap();

        let body = b"new binary".to_vec();
        let size = body.len() as u64;
        let expected = sha256_hex(&body).to_uppercase();
        let url = serve_bytes(body).await;

        let updater =
            SelfUpdater::with_executable(Client::new(), "http://127.0.0.1:1", exe.clone());
        let pending = updater
            .update_launcher(
                &descriptor(&url, size, Some(&expected)),
                &ProgressReporter::sink(),
                &CancellationToken::new(),
            )
            .await;

        let pending = pending.expect("update should be prepared");
        assert!(pending.script_path().exists());
        assert_eq!(
            tokio::fs::read(sibling_new_path(&exe)).await.unwrap(),
            b"new binary"
        );
    }

    #[tokio::test]
    async fn dropped_pending_cleans_script_and_downloaded_binary_up() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("launcher.exe");
        tokio::fs::write(&exe, b"old binary").await.unwrap();

        let body = b"new binary".to_vec();
        let size = body.len() as u64;
        let url = serve_bytes(body).await;

        let updater =
            SelfUpdater::with_executable(Client::new(), "http://127.0.0.1:1", exe.clone());
        let pending = updater
            .update_launcher(
                &descriptor(&url, size, None),
                &ProgressReporter::sink(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let script = pending.script_path().to_path_buf();
        let new_exe = sibling_new_path(&exe);
        assert!(script.exists());
        assert!(new_exe.exists());

        drop(pending);
        assert!(!script.exists());
        assert!(!new_exe.exists());
        // The running binary is untouched by the abort.
        assert_eq!(tokio::fs::read(&exe).await.unwrap(), b"old binary");
    }

    #[tokio::test]
    async fn phases_progress_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("launcher.exe");
        tokio::fs::write(&exe, b"old binary").await.unwrap();

        let body = b"new binary".to_vec();
        let size = body.len() as u64;
        let expected = sha256_hex(&body);
        let url = serve_bytes(body).await;

        let stages = Arc::new(Mutex::new(Vec::new()));
        let reporter = {
            let stages = stages.clone();
            ProgressReporter::new(move |u| stages.lock().unwrap().push(u.stage))
        };

        let updater =
            SelfUpdater::with_executable(Client::new(), "http://127.0.0.1:1", exe.clone());
        let pending = updater
            .update_launcher(
                &descriptor(&url, size, Some(&expected)),
                &reporter,
                &CancellationToken::new(),
            )
            .await;
        assert!(pending.is_some());

        let stages = stages.lock().unwrap();
        let position = |name: &str| stages.iter().position(|s| s == name).unwrap();
        assert!(position("Downloading") < position("Verifying"));
        assert!(position("Verifying") < position("Installing"));
        assert!(position("Installing") < position("Relaunching"));
    }

    #[test]
    fn relaunch_script_swaps_and_self_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("launcher");
        let new_exe = sibling_new_path(&exe);

        let script = write_relaunch_script(&exe, &new_exe).unwrap();
        let content = std::fs::read_to_string(&script).unwrap();
        assert!(content.contains(&exe.display().to_string()));
        assert!(content.contains(&new_exe.display().to_string()));
        if cfg!(target_os = "windows") {
            assert!(content.contains("del \"%~f0\""));
        } else {
            assert!(content.starts_with("#!/bin/sh"));
            assert!(content.contains("rm -- \"$0\""));
        }
        std::fs::remove_file(script).unwrap();
    }

    #[test]
    fn new_binary_lands_next_to_the_old_one() {
        assert_eq!(
            sibling_new_path(Path::new("/opt/launcher/app.exe")),
            Path::new("/opt/launcher/app_new.exe")
        );
        assert_eq!(
            sibling_new_path(Path::new("/opt/launcher/app")),
            Path::new("/opt/launcher/app_new")
        );
    }
}
