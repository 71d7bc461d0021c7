//! Extraction backend seam.
//!
//! The backend is a black box with two capabilities: resolve a source
//! locator to an info document, and materialize the audio for an info
//! document into a directory. [`YtDlp`] is the production implementation;
//! tests substitute their own.

mod ytdlp;

pub use ytdlp::YtDlp;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors reported by an extraction backend.
///
/// Messages are owned strings so a single failure can be handed to every
/// caller waiting on the same resolution.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend process could not be started
    #[error("Failed to launch {program}: {message}")]
    Spawn { program: String, message: String },
    /// The backend ran and reported failure
    #[error("Backend exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    /// The backend did not finish within its time budget
    #[error("Backend timed out after {0}s")]
    Timeout(u64),
    /// The backend's output was not a JSON document
    #[error("Backend produced invalid JSON: {0}")]
    InvalidJson(String),
    /// Local I/O while talking to the backend failed
    #[error("I/O error: {0}")]
    Io(String),
}

#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Resolve `locator` to the backend's info document without downloading.
    ///
    /// Playlists are extracted flat: entries carry only their locator and
    /// whatever identifying fields the backend returns without a full resolve.
    async fn extract_info(&self, locator: &str) -> Result<serde_json::Value, BackendError>;

    /// Materialize the audio described by the info document at `info_path`
    /// into `output_dir`, without resolving it again from the network.
    async fn download_with_info(
        &self,
        info_path: &Path,
        output_dir: &Path,
    ) -> Result<(), BackendError>;
}
