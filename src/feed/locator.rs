//! Episode locator codec.
//!
//! An episode is addressed by the episode endpoint URL with the item's
//! canonical source locator in the `source` query parameter. The mapping is
//! derived from the locator string alone, so URLs handed to feed readers
//! stay valid across restarts.

use thiserror::Error;
use url::Url;

/// Query parameter carrying the source locator.
pub const SOURCE_PARAM: &str = "source";

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("Invalid episode URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Missing `source` query parameter")]
    MissingSource,
}

/// Build the URL addressing `source` under the endpoint `base`.
///
/// Any query already on `base` is replaced.
pub fn encode(base: &Url, source: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.query_pairs_mut().append_pair(SOURCE_PARAM, source);
    url
}

/// Recover the source locator from an episode URL.
pub fn decode(url: &str) -> Result<String, LocatorError> {
    let url = Url::parse(url)?;
    decode_query(url.query())
}

/// Recover the source locator from a raw query string.
///
/// The first `source` pair wins; its value is returned exactly as decoded.
pub fn decode_query(query: Option<&str>) -> Result<String, LocatorError> {
    let query = query.ok_or(LocatorError::MissingSource)?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == SOURCE_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or(LocatorError::MissingSource)
}
