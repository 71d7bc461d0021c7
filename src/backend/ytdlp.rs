use super::{BackendError, ExtractionBackend};
use crate::util::{strip_control_chars, tail_lines};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Best available audio, falling back to the best combined stream.
const FORMAT_SELECTOR: &str = "bestaudio/best";
/// Codec of every materialized episode; must match the served media type.
const AUDIO_FORMAT: &str = "mp3";
/// Output template inside the per-fetch output directory.
const OUTPUT_TEMPLATE: &str = "%(id)s.%(ext)s";
/// Lines of stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 5;

const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// `yt-dlp` driven as a child process.
///
/// Every call spawns a fresh process, so there is no shared handle to guard.
/// Children are killed when the calling future is dropped.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    base_args: Vec<String>,
    extract_timeout: Duration,
    download_timeout: Duration,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            extract_timeout: DEFAULT_EXTRACT_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Arguments placed before every generated argument list.
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn with_timeouts(mut self, extract: Duration, download: Duration) -> Self {
        self.extract_timeout = extract;
        self.download_timeout = download;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command, timeout: Duration) -> Result<Output, BackendError> {
        let child = cmd.spawn().map_err(|e| BackendError::Spawn {
            program: self.program.display().to_string(),
            message: e.to_string(),
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| BackendError::Timeout(timeout.as_secs()))?
            .map_err(|e| BackendError::Io(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Exit {
                status: output.status.to_string(),
                stderr: tail_lines(&strip_control_chars(&stderr), STDERR_TAIL_LINES),
            });
        }

        Ok(output)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl ExtractionBackend for YtDlp {
    async fn extract_info(&self, locator: &str) -> Result<serde_json::Value, BackendError> {
        let mut cmd = self.command();
        cmd.args(["--dump-single-json", "--flat-playlist", "--no-warnings"])
            .arg("--")
            .arg(locator);

        tracing::debug!(locator = %locator, "Extracting metadata");
        let output = self.run(cmd, self.extract_timeout).await?;

        serde_json::from_slice(&output.stdout).map_err(|e| BackendError::InvalidJson(e.to_string()))
    }

    async fn download_with_info(
        &self,
        info_path: &Path,
        output_dir: &Path,
    ) -> Result<(), BackendError> {
        // Partial downloads and pre-conversion files stay out of the output directory.
        let partial_dir = output_dir.with_file_name("partial");

        let mut cmd = self.command();
        cmd.arg("--load-info-json")
            .arg(info_path)
            .args(["-f", FORMAT_SELECTOR])
            .args(["-x", "--audio-format", AUDIO_FORMAT])
            .args(["--no-progress", "--no-warnings"])
            .arg("-P")
            .arg(format!("home:{}", output_dir.display()))
            .arg("-P")
            .arg(format!("temp:{}", partial_dir.display()))
            .args(["-o", OUTPUT_TEMPLATE]);

        tracing::debug!(
            info = %info_path.display(),
            output = %output_dir.display(),
            "Materializing audio"
        );
        self.run(cmd, self.download_timeout).await?;
        Ok(())
    }
}
