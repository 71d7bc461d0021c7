use crate::episode::FetchError;
use crate::feed::locator::LocatorError;
use crate::feed::FeedError;
use crate::metadata::ResolveError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Every way a request can fail, mapped onto an HTTP status.
///
/// - malformed requests → 400
/// - the backend failing to extract or download → 502
/// - a feed requested for a single item → 422
/// - everything else → 500
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Locator(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Resolve(e) | ApiError::Feed(FeedError::Resolve(e)) => resolve_status(e),
            ApiError::Feed(FeedError::NotAPlaylist(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Feed(FeedError::Render(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Fetch(FetchError::Download(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Fetch(FetchError::NotAnItem(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn resolve_status(err: &ResolveError) -> StatusCode {
    match err {
        ResolveError::Extraction { .. } => StatusCode::BAD_GATEWAY,
        ResolveError::MalformedRecord { .. } | ResolveError::Aborted { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
