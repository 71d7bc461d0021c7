//! Feed synthesis for podcast clients.
//!
//! - [`synthesize`] turns a playlist record into a [`FeedDocument`],
//!   resolving each entry through a caller-supplied resolver
//! - [`render_atom`] serializes the document as Atom with the iTunes
//!   podcast namespace
//! - [`locator`] encodes and decodes the episode URLs used as entry ids and
//!   enclosures
//!
//! # Example
//!
//! ```ignore
//! let playlist = cache.get_or_resolve(source).await?;
//! let resolve = |stub: EntryStub| {
//!     let cache = cache.clone();
//!     async move { cache.get_or_resolve(&stub.locator).await }
//! };
//! let doc = synthesize(&playlist, resolve, &links, 8).await?;
//! let xml = render_atom(&doc, Utc::now())?;
//! ```

mod atom;
pub mod locator;
mod synthesizer;

pub use atom::render_atom;
pub use synthesizer::{synthesize, FeedLinks};

use crate::metadata::ResolveError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Media type of every enclosure and served episode.
pub const EPISODE_MEDIA_TYPE: &str = "audio/mpeg";

#[derive(Debug, Error)]
pub enum FeedError {
    /// Resolving the playlist or one of its entries failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The source resolved to a single item, not a playlist
    #[error("Source is not a playlist: {0}")]
    NotAPlaylist(String),
    /// Writing the XML document failed
    #[error("Failed to render feed: {0}")]
    Render(String),
}

/// A synthesized syndication document.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedDocument {
    pub id: String,
    pub title: String,
    pub self_link: String,
    pub alternate_link: String,
    pub description: String,
    pub entries: Vec<FeedEntry>,
}

/// One publishable episode.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub enclosure_url: String,
    pub media_type: &'static str,
    pub published: DateTime<Utc>,
    pub duration_secs: Option<u64>,
}
