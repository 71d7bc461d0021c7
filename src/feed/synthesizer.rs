use super::{locator, FeedDocument, FeedEntry, FeedError, EPISODE_MEDIA_TYPE};
use crate::metadata::{EntryStub, MetadataRecord, RecordKind, ResolveError};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// Links that depend on how the feed was requested.
#[derive(Debug, Clone)]
pub struct FeedLinks {
    /// URL the feed itself was fetched from; also the feed id
    pub self_url: String,
    /// The playlist's own page
    pub alternate_url: String,
    /// Episode endpoint that enclosure URLs are built on
    pub episode_base: Url,
}

/// Build a feed document from a playlist record.
///
/// Entries are resolved through `resolve_entry`, up to `concurrency` at a
/// time, and emitted in playlist order regardless of completion order.
/// Entries without a release time are left out; nothing else is filtered.
///
/// # Errors
///
/// The first entry that fails to resolve aborts the whole feed with its
/// error. Resolutions already started are not cancelled by the abort when
/// `resolve_entry` is backed by [`MetadataCache`](crate::metadata::MetadataCache),
/// so their results still reach the cache.
pub async fn synthesize<F, Fut>(
    playlist: &MetadataRecord,
    resolve_entry: F,
    links: &FeedLinks,
    concurrency: usize,
) -> Result<FeedDocument, FeedError>
where
    F: FnMut(EntryStub) -> Fut,
    Fut: Future<Output = Result<Arc<MetadataRecord>, ResolveError>>,
{
    if playlist.kind != RecordKind::Playlist {
        return Err(FeedError::NotAPlaylist(playlist.original_locator.clone()));
    }

    // Owned stubs keep the resolver futures free of borrows from `playlist`.
    let records: Vec<Arc<MetadataRecord>> = stream::iter(playlist.entries.clone())
        .map(resolve_entry)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let entries: Vec<FeedEntry> = playlist
        .entries
        .iter()
        .zip(&records)
        .filter_map(|(stub, record)| match record.release_time {
            Some(published) => Some(feed_entry(&links.episode_base, record, published)),
            None => {
                tracing::debug!(entry = %stub.locator, "Skipping entry without release time");
                None
            }
        })
        .collect();

    tracing::info!(
        playlist = %playlist.original_locator,
        total = playlist.entries.len(),
        published = entries.len(),
        "Synthesized feed"
    );

    Ok(FeedDocument {
        id: links.self_url.clone(),
        title: playlist.title.clone(),
        self_link: links.self_url.clone(),
        alternate_link: links.alternate_url.clone(),
        description: playlist.description_or_title().to_string(),
        entries,
    })
}

fn feed_entry(episode_base: &Url, record: &MetadataRecord, published: DateTime<Utc>) -> FeedEntry {
    let url = locator::encode(episode_base, &record.original_locator).to_string();
    FeedEntry {
        id: url.clone(),
        title: record.title.clone(),
        description: record.description_or_title().to_string(),
        enclosure_url: url,
        media_type: EPISODE_MEDIA_TYPE,
        published,
        duration_secs: record.duration_secs,
    }
}
