//! Metadata resolution and caching.
//!
//! - [`MetadataRecord`] - normalized view of a backend info document
//! - [`MetadataResolver`] - one backend call per resolve, no retries
//! - [`MetadataCache`] - TTL memo with single-flight collapsing

mod cache;
mod record;
mod resolver;

pub use cache::{MetadataCache, DEFAULT_TTL};
pub use record::{EntryStub, MetadataRecord, RecordKind};
pub use resolver::MetadataResolver;

use crate::backend::BackendError;
use thiserror::Error;

/// Errors from resolving a source locator.
///
/// Cloneable so one failed resolution can be delivered to every caller
/// that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The backend could not resolve the locator
    #[error("Failed to extract {locator}: {source}")]
    Extraction {
        locator: String,
        #[source]
        source: BackendError,
    },
    /// The backend's output does not fit the declared kind
    #[error("Malformed metadata for {locator}: {reason}")]
    MalformedRecord { locator: String, reason: String },
    /// The resolution task died before producing a result
    #[error("Resolution of {locator} aborted: {reason}")]
    Aborted { locator: String, reason: String },
}
