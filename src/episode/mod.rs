//! On-demand audio retrieval for a single episode.

mod fetcher;

pub use fetcher::{Episode, EpisodeFetcher, FetchError};
