use super::{MetadataRecord, ResolveError};
use crate::backend::ExtractionBackend;
use std::sync::Arc;

/// Uniform front for the extraction backend.
///
/// One backend call per [`resolve`](Self::resolve), no retries: failures go
/// straight back to the caller.
#[derive(Clone)]
pub struct MetadataResolver {
    backend: Arc<dyn ExtractionBackend>,
}

impl MetadataResolver {
    pub fn new(backend: Arc<dyn ExtractionBackend>) -> Self {
        Self { backend }
    }

    pub async fn resolve(&self, locator: &str) -> Result<MetadataRecord, ResolveError> {
        let info = self
            .backend
            .extract_info(locator)
            .await
            .map_err(|source| ResolveError::Extraction {
                locator: locator.to_string(),
                source,
            })?;

        let record = MetadataRecord::from_info(locator, info)?;
        tracing::debug!(
            locator = %locator,
            kind = ?record.kind,
            entries = record.entries.len(),
            "Resolved metadata"
        );
        Ok(record)
    }
}
