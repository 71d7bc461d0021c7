use crate::backend::{BackendError, ExtractionBackend};
use crate::feed::EPISODE_MEDIA_TYPE;
use crate::metadata::{MetadataRecord, RecordKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;

const SCRATCH_PREFIX: &str = "ytdlpod-";
const INFO_FILE: &str = "info.json";
const OUTPUT_DIR: &str = "out";

/// Errors that can occur while producing an episode's audio.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend failed to materialize the audio
    #[error("Download failed: {0}")]
    Download(#[from] BackendError),
    /// Materialization produced zero or several files
    #[error("Expected exactly one output file, found {0}")]
    UnexpectedOutput(usize),
    /// The record is a playlist, which has no single audio stream
    #[error("Not a single item: {0}")]
    NotAnItem(String),
    /// The info descriptor could not be serialized
    #[error("Failed to write info descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
    /// Scratch area I/O failed
    #[error("Scratch I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio produced for one episode.
#[derive(Debug)]
pub struct Episode {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
    /// Exact byte count of `bytes`
    pub length: u64,
}

/// Materializes episode audio in a private scratch directory.
///
/// Each fetch gets its own directory which is removed before the fetch
/// returns, whatever the outcome. The directory is also removed if the
/// fetch future is dropped mid-download.
#[derive(Clone)]
pub struct EpisodeFetcher {
    backend: Arc<dyn ExtractionBackend>,
    scratch_parent: Option<PathBuf>,
}

impl EpisodeFetcher {
    pub fn new(backend: Arc<dyn ExtractionBackend>) -> Self {
        Self {
            backend,
            scratch_parent: None,
        }
    }

    /// Create scratch directories under `parent` instead of the system temp dir.
    pub fn with_scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }

    pub async fn fetch(&self, record: &MetadataRecord) -> Result<Episode, FetchError> {
        if record.kind != RecordKind::Item {
            return Err(FetchError::NotAnItem(record.original_locator.clone()));
        }

        let scratch = self.scratch_dir()?;
        tracing::info!(
            episode = %record.original_locator,
            scratch = %scratch.path().display(),
            "Fetching episode"
        );

        let result = self.fetch_in(scratch.path(), record).await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                scratch = %scratch_path.display(),
                error = %e,
                "Failed to remove scratch directory"
            );
        }

        match &result {
            Ok(episode) => tracing::info!(
                episode = %record.original_locator,
                bytes = episode.length,
                "Episode ready"
            ),
            Err(e) => tracing::warn!(
                episode = %record.original_locator,
                error = %e,
                "Episode fetch failed"
            ),
        }
        result
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        match &self.scratch_parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
    }

    async fn fetch_in(&self, scratch: &Path, record: &MetadataRecord) -> Result<Episode, FetchError> {
        // The descriptor lets the backend skip re-resolving the item.
        let info_path = scratch.join(INFO_FILE);
        tokio::fs::write(&info_path, serde_json::to_vec(&record.info)?).await?;

        let output_dir = scratch.join(OUTPUT_DIR);
        tokio::fs::create_dir(&output_dir).await?;

        self.backend
            .download_with_info(&info_path, &output_dir)
            .await?;

        let file = single_output(&output_dir).await?;
        let bytes = tokio::fs::read(&file).await?;
        let length = bytes.len() as u64;

        Ok(Episode {
            bytes,
            media_type: EPISODE_MEDIA_TYPE,
            length,
        })
    }
}

/// The only entry in `dir`; anything else means the backend configuration
/// and the upstream disagree about the number of audio streams.
async fn single_output(dir: &Path) -> Result<PathBuf, FetchError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        found.push(entry.path());
    }

    match found.len() {
        1 => Ok(found.remove(0)),
        n => {
            tracing::error!(dir = %dir.display(), files = ?found, "Unexpected backend output");
            Err(FetchError::UnexpectedOutput(n))
        }
    }
}
