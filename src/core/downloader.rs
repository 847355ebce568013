use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::{UpdateError, UpdateResult};

/// A uniquely named file in the system temp directory, removed on drop
/// unless explicitly kept. Guarantees no partial download survives an
/// error path.
pub struct TempDownload {
    path: PathBuf,
    keep: bool,
}

impl TempDownload {
    pub fn new(prefix: &str, extension: &str) -> Self {
        let name = format!("{prefix}-{}.{extension}", uuid::Uuid::new_v4());
        Self {
            path: std::env::temp_dir().join(name),
            keep: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the cleanup, e.g. to retain a partially extracted archive
    /// for inspection.
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for TempDownload {
    fn drop(&mut self) {
        if !self.keep {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Stream a URL to `dest`, reporting `(bytes_so_far, total_bytes)` after
/// every chunk and honouring cancellation between chunks.
///
/// On any failure (HTTP status, network, cancellation) the partial file is
/// removed before the error is returned. Returns the number of bytes
/// written.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    expected_size: Option<u64>,
    cancel: &CancellationToken,
    mut on_bytes: impl FnMut(u64, Option<u64>),
) -> UpdateResult<u64> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| UpdateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let result = stream_response(client, url, dest, expected_size, cancel, &mut on_bytes).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(dest).await;
    }
    result
}

async fn stream_response(
    client: &Client,
    url: &str,
    dest: &Path,
    expected_size: Option<u64>,
    cancel: &CancellationToken,
    on_bytes: &mut impl FnMut(u64, Option<u64>),
) -> UpdateResult<u64> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpdateError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let total = response.content_length().or(expected_size);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    // Scoped so the handle is dropped before any rename/delete on Windows.
    {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| UpdateError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(UpdateError::Cancelled);
            }
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|source| UpdateError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
            written += chunk.len() as u64;
            on_bytes(written, total);
        }

        file.flush().await.map_err(|source| UpdateError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
    }

    debug!("Downloaded {written} bytes: {url} -> {dest:?}");
    Ok(written)
}
