use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the update backend.
/// Every module returns `Result<T, UpdateError>`.
///
/// None of these escape the public operations: `check_for_updates`,
/// `update_content` and `update_launcher` catch them at the boundary and
/// turn them into a decision/boolean plus a progress message.
#[derive(Debug, Error)]
pub enum UpdateError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download cancelled")]
    Cancelled,

    // ── Remote metadata ─────────────────────────────────
    #[error("Malformed remote response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid version string: {0}")]
    InvalidVersionFormat(String),

    // ── Content pack ────────────────────────────────────
    #[error("Not enough free disk space: need {required} bytes, {available} available")]
    InsufficientDiskSpace { required: u64, available: u64 },

    #[error("Downloaded file corrupted: {0}")]
    CorruptArchive(String),

    #[error("Extraction failed after {applied} entries: {reason}")]
    PartialExtraction { applied: u64, reason: String },

    // ── Self-update ─────────────────────────────────────
    #[error("SHA-256 mismatch for {path:?}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Archive ─────────────────────────────────────────
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type UpdateResult<T> = Result<T, UpdateError>;

impl From<std::io::Error> for UpdateError {
    fn from(source: std::io::Error) -> Self {
        UpdateError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
