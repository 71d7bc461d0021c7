//! Configuration file parser for ~/.config/ytdlpod/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos.
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,

    /// Externally visible base URL for self and enclosure links.
    /// When unset, links are built from the request's `Host` header.
    pub public_url: Option<Url>,

    /// Path or name of the yt-dlp executable.
    pub ytdlp_path: PathBuf,

    /// Extra arguments passed to every yt-dlp invocation (e.g. cookies).
    pub ytdlp_extra_args: Vec<String>,

    /// Seconds a resolved record stays cached.
    pub cache_ttl_secs: u64,

    /// Maximum entries resolved concurrently while building one feed.
    pub entry_concurrency: usize,

    /// Time budget for one metadata extraction, in seconds.
    pub extract_timeout_secs: u64,

    /// Time budget for one audio download and conversion, in seconds.
    pub download_timeout_secs: u64,

    /// Parent directory for per-fetch scratch directories.
    /// Defaults to the system temp directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            public_url: None,
            ytdlp_path: PathBuf::from("yt-dlp"),
            ytdlp_extra_args: Vec::new(),
            cache_ttl_secs: 300,
            entry_concurrency: 8,
            extract_timeout_secs: 120,
            download_timeout_secs: 30 * 60,
            scratch_dir: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "bind",
        "public_url",
        "ytdlp_path",
        "ytdlp_extra_args",
        "cache_ttl_secs",
        "entry_concurrency",
        "extract_timeout_secs",
        "download_timeout_secs",
        "scratch_dir",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), bind = %config.bind, "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache_ttl_secs must be at least 1".into()));
        }
        if self.entry_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "entry_concurrency must be at least 1".into(),
            ));
        }
        if self.extract_timeout_secs == 0 || self.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        if let Some(url) = &self.public_url {
            if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "public_url must be an http(s) base URL, got {url}"
                )));
            }
        }
        Ok(())
    }

    /// `public_url` with a trailing slash, ready for `Url::join`.
    pub fn public_base(&self) -> Option<Url> {
        self.public_url.as_ref().map(|url| {
            let mut url = url.clone();
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            url.set_query(None);
            url.set_fragment(None);
            url
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
