//! Serve any playlist the extraction backend understands as a podcast feed.
//!
//! Request flow:
//!
//! - `/feed` resolves a playlist through [`metadata::MetadataCache`], resolves
//!   each entry, and renders an Atom document via [`feed`]
//! - `/episode` decodes an episode locator, resolves the item, and hands it
//!   to [`episode::EpisodeFetcher`] which materializes the audio
//!
//! The extraction backend sits behind [`backend::ExtractionBackend`]; the
//! production implementation shells out to `yt-dlp`.

pub mod backend;
pub mod config;
pub mod episode;
pub mod feed;
pub mod metadata;
pub mod util;
pub mod web;
