use super::{ApiError, AppState};
use crate::feed::{self, locator, FeedLinks};
use axum::extract::{RawQuery, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use url::Url;

const ATOM_CONTENT_TYPE: &str = "application/atom+xml; charset=utf-8";

#[tracing::instrument(skip_all)]
pub(super) async fn feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let source = locator::decode_query(query.as_deref())?;
    tracing::debug!(source = %source, "Feed requested");
    let base = base_url(&state, &headers)?;

    let mut self_url = join(&base, "feed")?;
    self_url.set_query(query.as_deref());
    let links = FeedLinks {
        self_url: self_url.to_string(),
        alternate_url: source.clone(),
        episode_base: join(&base, "episode")?,
    };

    let playlist = state.cache.get_or_resolve(&source).await?;
    let cache = &state.cache;
    let doc = feed::synthesize(
        &playlist,
        move |stub| {
            let cache = cache.clone();
            async move { cache.get_or_resolve(&stub.locator).await }
        },
        &links,
        state.entry_concurrency,
    )
    .await?;

    let body = feed::render_atom(&doc, Utc::now())?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(ATOM_CONTENT_TYPE))],
        body,
    )
        .into_response())
}

#[tracing::instrument(skip_all)]
pub(super) async fn episode(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let source = locator::decode_query(query.as_deref())?;
    tracing::debug!(source = %source, "Episode requested");
    let record = state.cache.get_or_resolve(&source).await?;
    let episode = state.fetcher.fetch(&record).await?;

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(episode.media_type)),
            (CONTENT_LENGTH, HeaderValue::from(episode.length)),
        ],
        episode.bytes,
    )
        .into_response())
}

/// The backend's info document for `source`, as cached.
#[tracing::instrument(skip_all)]
pub(super) async fn infojson(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<serde_json::Value>, ApiError> {
    let source = locator::decode_query(query.as_deref())?;
    tracing::debug!(source = %source, "Info document requested");
    let record = state.cache.get_or_resolve(&source).await?;
    Ok(Json(record.info.clone()))
}

pub(super) async fn healthz() -> &'static str {
    "ok"
}

/// Base URL that generated links hang off.
///
/// The configured public URL wins; otherwise the request's `Host` header is
/// used over plain http.
fn base_url(state: &AppState, headers: &HeaderMap) -> Result<Url, ApiError> {
    if let Some(base) = &state.public_base {
        return Ok(base.clone());
    }

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing Host header".to_string()))?;

    Url::parse(&format!("http://{host}/"))
        .map_err(|e| ApiError::BadRequest(format!("invalid Host header {host:?}: {e}")))
}

fn join(base: &Url, endpoint: &str) -> Result<Url, ApiError> {
    base.join(endpoint)
        .map_err(|e| ApiError::BadRequest(format!("cannot build {endpoint} URL: {e}")))
}
