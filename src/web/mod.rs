//! HTTP surface: `/feed`, `/episode`, `/infojson` and a liveness probe.

mod error;
mod handlers;

pub use error::ApiError;

use crate::backend::ExtractionBackend;
use crate::config::Config;
use crate::episode::EpisodeFetcher;
use crate::metadata::{MetadataCache, MetadataResolver};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use url::Url;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: MetadataCache,
    pub fetcher: EpisodeFetcher,
    /// Base for generated links; `None` derives it from the `Host` header.
    pub public_base: Option<Url>,
    pub entry_concurrency: usize,
}

impl AppState {
    pub fn new(cache: MetadataCache, fetcher: EpisodeFetcher) -> Self {
        Self {
            cache,
            fetcher,
            public_base: None,
            entry_concurrency: 8,
        }
    }

    /// Wire the cache, resolver and fetcher around one backend instance.
    pub fn from_config(config: &Config, backend: Arc<dyn ExtractionBackend>) -> Self {
        let cache =
            MetadataCache::with_ttl(MetadataResolver::new(backend.clone()), config.cache_ttl());

        let mut fetcher = EpisodeFetcher::new(backend);
        if let Some(dir) = &config.scratch_dir {
            fetcher = fetcher.with_scratch_parent(dir);
        }

        Self {
            cache,
            fetcher,
            public_base: config.public_base(),
            entry_concurrency: config.entry_concurrency,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/feed", get(handlers::feed))
        .route("/episode", get(handlers::episode))
        .route("/infojson", get(handlers::infojson))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
