//! Shared fixtures: an in-memory catalog standing in for yt-dlp.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use ytdlpod::backend::{BackendError, ExtractionBackend};

pub const PLAYLIST: &str = "https://video.example.com/playlist?list=PL123";
pub const EPISODE_ONE: &str = "https://video.example.com/watch?v=one";
pub const EPISODE_TWO: &str = "https://video.example.com/watch?v=two";
pub const UPCOMING: &str = "https://video.example.com/watch?v=soon";

/// Backend serving fixed info documents.
///
/// Downloads write `<id>.mp3` containing `audio:<id>`, so tests can tell
/// which item was materialized.
#[derive(Default)]
pub struct CatalogBackend {
    infos: HashMap<String, Value>,
    extractions: Mutex<HashMap<String, usize>>,
}

impl CatalogBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A three-entry playlist: two released episodes and one premiere.
    pub fn podcast() -> Self {
        Self::new()
            .with_info(
                PLAYLIST,
                json!({
                    "_type": "playlist",
                    "id": "PL123",
                    "title": "Weekly Show",
                    "description": "Every week, one hour.",
                    "webpage_url": PLAYLIST,
                    "entries": [
                        {"_type": "url", "url": EPISODE_TWO, "id": "two", "title": "Two"},
                        {"_type": "url", "url": UPCOMING, "id": "soon", "title": "Soon"},
                        {"_type": "url", "url": EPISODE_ONE, "id": "one", "title": "One"},
                    ],
                }),
            )
            .with_info(EPISODE_ONE, item("one", "Episode One", 1_700_000_000))
            .with_info(EPISODE_TWO, item("two", "Episode Two", 1_700_604_800))
            .with_info(
                UPCOMING,
                json!({
                    "_type": "video",
                    "id": "soon",
                    "title": "Live premiere",
                    "webpage_url": UPCOMING,
                    "release_timestamp": null,
                }),
            )
    }

    pub fn with_info(mut self, locator: &str, info: Value) -> Self {
        self.infos.insert(locator.to_string(), info);
        self
    }

    pub fn extractions(&self, locator: &str) -> usize {
        self.extractions
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or(0)
    }
}

pub fn item(id: &str, title: &str, released: i64) -> Value {
    json!({
        "_type": "video",
        "id": id,
        "title": title,
        "description": format!("Notes for {title}"),
        "webpage_url": format!("https://video.example.com/watch?v={id}"),
        "release_timestamp": released,
        "duration": 3600.0,
    })
}

#[async_trait]
impl ExtractionBackend for CatalogBackend {
    async fn extract_info(&self, locator: &str) -> Result<Value, BackendError> {
        *self
            .extractions
            .lock()
            .unwrap()
            .entry(locator.to_string())
            .or_default() += 1;

        self.infos.get(locator).cloned().ok_or_else(|| BackendError::Exit {
            status: "exit status: 1".to_string(),
            stderr: format!("ERROR: [generic] Unable to download webpage: {locator}"),
        })
    }

    async fn download_with_info(&self, info_path: &Path, output_dir: &Path) -> Result<(), BackendError> {
        let raw = std::fs::read(info_path).map_err(|e| BackendError::Io(e.to_string()))?;
        let info: Value =
            serde_json::from_slice(&raw).map_err(|e| BackendError::InvalidJson(e.to_string()))?;
        let id = info["id"].as_str().unwrap_or("unknown");

        std::fs::write(output_dir.join(format!("{id}.mp3")), format!("audio:{id}"))
            .map_err(|e| BackendError::Io(e.to_string()))
    }
}
