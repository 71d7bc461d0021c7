use super::ResolveError;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Whether a record describes a playlist or a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Playlist,
    Item,
}

/// A playlist entry as returned by a flat extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStub {
    /// Locator to resolve for the full item record
    pub locator: String,
    pub id: Option<String>,
    pub title: Option<String>,
}

/// Normalized metadata for a playlist or an item.
#[derive(Debug, Clone)]
pub struct MetadataRecord {
    pub kind: RecordKind,
    pub title: String,
    pub description: Option<String>,
    /// Release instant; `None` means the item is not yet publishable.
    pub release_time: Option<DateTime<Utc>>,
    /// Canonical locator for re-resolving this record.
    pub original_locator: String,
    /// Item duration in whole seconds, when known.
    pub duration_secs: Option<u64>,
    /// Playlist entries in backend order; empty for items.
    pub entries: Vec<EntryStub>,
    /// The backend's info document this record was built from.
    pub info: Value,
}

impl MetadataRecord {
    /// Normalize a backend info document obtained by resolving `requested`.
    ///
    /// Playlists must carry an `entries` array; both kinds must carry a
    /// string `title`. The canonical locator comes from `original_url`, then
    /// `webpage_url`, then `requested`.
    pub fn from_info(requested: &str, info: Value) -> Result<Self, ResolveError> {
        let object = info
            .as_object()
            .ok_or_else(|| malformed(requested, "info is not a JSON object"))?;

        let kind = match object.get("_type").and_then(Value::as_str) {
            Some("playlist") | Some("multi_video") => RecordKind::Playlist,
            _ => RecordKind::Item,
        };

        // Any string counts, blank included; only a missing title is malformed.
        let title = info
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(requested, "missing title"))?
            .to_string();

        let description = str_field(&info, "description").map(str::to_string);

        let original_locator = str_field(&info, "original_url")
            .or_else(|| str_field(&info, "webpage_url"))
            .unwrap_or(requested)
            .to_string();

        let (release_time, duration_secs, entries) = match kind {
            RecordKind::Item => (
                release_time(requested, &info)?,
                info.get("duration").and_then(Value::as_f64).and_then(whole_secs),
                Vec::new(),
            ),
            RecordKind::Playlist => (None, None, entry_stubs(requested, &info)?),
        };

        Ok(Self {
            kind,
            title,
            description,
            release_time,
            original_locator,
            duration_secs,
            entries,
            info,
        })
    }

    /// A record is publishable iff it has a release time.
    ///
    /// This is the only criterion for including an entry in a feed.
    pub fn is_publishable(&self) -> bool {
        self.release_time.is_some()
    }

    /// Description, or the title when the backend gave none.
    pub fn description_or_title(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.title)
    }
}

fn malformed(locator: &str, reason: impl Into<String>) -> ResolveError {
    ResolveError::MalformedRecord {
        locator: locator.to_string(),
        reason: reason.into(),
    }
}

/// Non-empty string field; null, missing and "" are all absent.
fn str_field<'a>(info: &'a Value, key: &str) -> Option<&'a str> {
    info.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn whole_secs(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value as u64)
}

fn release_time(requested: &str, info: &Value) -> Result<Option<DateTime<Utc>>, ResolveError> {
    let secs = match info.get("release_timestamp") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Some(_) => None,
    };

    secs.and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(Some)
        .ok_or_else(|| malformed(requested, "release_timestamp is not a valid epoch time"))
}

fn entry_stubs(requested: &str, info: &Value) -> Result<Vec<EntryStub>, ResolveError> {
    let entries = info
        .get("entries")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(requested, "playlist without entries"))?;

    entries
        .iter()
        .enumerate()
        // The backend reports unavailable entries as null.
        .filter(|(_, entry)| !entry.is_null())
        .map(|(index, entry)| {
            let locator = str_field(entry, "url")
                .or_else(|| str_field(entry, "webpage_url"))
                .ok_or_else(|| malformed(requested, format!("entry {index} has no url")))?;
            Ok(EntryStub {
                locator: locator.to_string(),
                id: str_field(entry, "id").map(str::to_string),
                title: str_field(entry, "title").map(str::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_item_record() {
        let record = MetadataRecord::from_info(
            "https://example.com/watch?v=abc",
            json!({
                "_type": "video",
                "id": "abc",
                "title": "Episode A",
                "description": "About A",
                "release_timestamp": 1_700_000_000,
                "original_url": "https://example.com/watch?v=abc&feature=share",
                "webpage_url": "https://example.com/watch?v=abc",
                "duration": 754.6,
            }),
        )
        .unwrap();

        assert_eq!(record.kind, RecordKind::Item);
        assert_eq!(record.title, "Episode A");
        assert_eq!(record.description.as_deref(), Some("About A"));
        assert_eq!(
            record.release_time,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(
            record.original_locator,
            "https://example.com/watch?v=abc&feature=share"
        );
        assert_eq!(record.duration_secs, Some(754));
        assert!(record.entries.is_empty());
        assert!(record.is_publishable());
    }

    #[test]
    fn test_item_without_type_is_item() {
        let record = MetadataRecord::from_info("x", json!({"title": "T"})).unwrap();
        assert_eq!(record.kind, RecordKind::Item);
        assert!(!record.is_publishable());
    }

    #[test]
    fn test_null_release_timestamp_is_absent() {
        let record =
            MetadataRecord::from_info("x", json!({"title": "T", "release_timestamp": null}))
                .unwrap();
        assert_eq!(record.release_time, None);
    }

    #[test]
    fn test_float_release_timestamp_truncated() {
        let record =
            MetadataRecord::from_info("x", json!({"title": "T", "release_timestamp": 1000.9}))
                .unwrap();
        assert_eq!(record.release_time, DateTime::from_timestamp(1000, 0));
    }

    #[test]
    fn test_non_numeric_release_timestamp_is_malformed() {
        let result =
            MetadataRecord::from_info("x", json!({"title": "T", "release_timestamp": "soon"}));
        assert!(matches!(result, Err(ResolveError::MalformedRecord { .. })));
    }

    #[test]
    fn test_original_locator_fallbacks() {
        let from_webpage =
            MetadataRecord::from_info("req", json!({"title": "T", "webpage_url": "page"}))
                .unwrap();
        assert_eq!(from_webpage.original_locator, "page");

        let from_request = MetadataRecord::from_info("req", json!({"title": "T"})).unwrap();
        assert_eq!(from_request.original_locator, "req");
    }

    #[test]
    fn test_empty_description_is_absent() {
        let record =
            MetadataRecord::from_info("x", json!({"title": "Episode A", "description": ""}))
                .unwrap();
        assert_eq!(record.description, None);
        assert_eq!(record.description_or_title(), "Episode A");
    }

    #[test]
    fn test_missing_title_is_malformed() {
        let result = MetadataRecord::from_info("x", json!({"_type": "video"}));
        match result {
            Err(ResolveError::MalformedRecord { locator, reason }) => {
                assert_eq!(locator, "x");
                assert!(reason.contains("title"));
            }
            other => panic!("Expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_title_is_kept() {
        let record = MetadataRecord::from_info(
            "x",
            json!({"title": "  ", "description": "", "release_timestamp": 1}),
        )
        .unwrap();
        assert_eq!(record.title, "  ");
        assert_eq!(record.description_or_title(), "  ");
        assert!(record.is_publishable());
    }

    #[test]
    fn test_non_string_title_is_malformed() {
        let result = MetadataRecord::from_info("x", json!({"title": 42}));
        assert!(matches!(result, Err(ResolveError::MalformedRecord { .. })));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let result = MetadataRecord::from_info("x", json!([1, 2, 3]));
        assert!(matches!(result, Err(ResolveError::MalformedRecord { .. })));
    }

    #[test]
    fn test_playlist_entries_in_order() {
        let record = MetadataRecord::from_info(
            "https://example.com/playlist?list=PL1",
            json!({
                "_type": "playlist",
                "title": "My Show",
                "description": null,
                "entries": [
                    {"_type": "url", "url": "https://example.com/watch?v=2", "id": "2", "title": "Two"},
                    null,
                    {"_type": "url", "webpage_url": "https://example.com/watch?v=1", "id": "1"},
                ],
            }),
        )
        .unwrap();

        assert_eq!(record.kind, RecordKind::Playlist);
        assert_eq!(record.description, None);
        assert_eq!(
            record.entries,
            vec![
                EntryStub {
                    locator: "https://example.com/watch?v=2".to_string(),
                    id: Some("2".to_string()),
                    title: Some("Two".to_string()),
                },
                EntryStub {
                    locator: "https://example.com/watch?v=1".to_string(),
                    id: Some("1".to_string()),
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn test_playlist_ignores_release_timestamp() {
        let record = MetadataRecord::from_info(
            "x",
            json!({"_type": "playlist", "title": "P", "entries": [], "release_timestamp": 5}),
        )
        .unwrap();
        assert_eq!(record.release_time, None);
    }

    #[test]
    fn test_playlist_without_entries_is_malformed() {
        let result = MetadataRecord::from_info("x", json!({"_type": "playlist", "title": "P"}));
        assert!(matches!(result, Err(ResolveError::MalformedRecord { .. })));
    }

    #[test]
    fn test_playlist_entry_without_url_is_malformed() {
        let result = MetadataRecord::from_info(
            "x",
            json!({"_type": "playlist", "title": "P", "entries": [{"id": "1"}]}),
        );
        match result {
            Err(ResolveError::MalformedRecord { reason, .. }) => {
                assert!(reason.contains("entry 0"));
            }
            other => panic!("Expected MalformedRecord, got {other:?}"),
        }
    }
}
