//! Record sync engine: create-once, update-thereafter per fingerprint.

use std::sync::Arc;

use crate::database::RecordDatabase;
use crate::error::{Error, Result};
use crate::guard::InFlightGuard;
use crate::models::{CloudRecord, ExternalRecord, RecordFields, TAG_NEEDS_EDIT};
use crate::store::MappingStore;

/// Mirrors single cloud records into the external database.
///
/// Owns the in-flight guard, so concurrent attempts on the same fingerprint
/// through this engine (or any clone of its guard) are rejected.
pub struct RecordSyncEngine {
    database: Arc<dyn RecordDatabase>,
    store: Arc<dyn MappingStore>,
    guard: InFlightGuard,
}

impl RecordSyncEngine {
    pub fn new(database: Arc<dyn RecordDatabase>, store: Arc<dyn MappingStore>) -> Self {
        Self::with_guard(database, store, InFlightGuard::new())
    }

    pub fn with_guard(
        database: Arc<dyn RecordDatabase>,
        store: Arc<dyn MappingStore>,
        guard: InFlightGuard,
    ) -> Self {
        Self {
            database,
            store,
            guard,
        }
    }

    pub const fn guard(&self) -> &InFlightGuard {
        &self.guard
    }

    /// Create the record on first sight of its fingerprint, otherwise update its URL.
    ///
    /// On create the [`TAG_NEEDS_EDIT`] tag is appended and the new record id is
    /// written to the mapping store. Updates send the URL only, so names and tags
    /// edited inside the database are never overwritten.
    pub async fn sync(&self, mut record: CloudRecord) -> Result<ExternalRecord> {
        let fingerprint = record.fingerprint();
        let _permit = self
            .guard
            .acquire(&fingerprint)
            .map_err(|_| Error::DuplicateInProgress {
                fingerprint: fingerprint.to_string(),
            })?;

        let mapping_key = fingerprint.mapping_key();
        let stored = self
            .store
            .get(&mapping_key)
            .await
            .map_err(|source| Error::store("lookup_mapping", source))?;

        if let Some(record_id) = stored {
            tracing::info!(
                fingerprint = %fingerprint,
                title = %record.title,
                record_id = %record_id,
                "External record found, updating URL"
            );
            return self
                .database
                .update_record_url(&record_id, &record.url)
                .await
                .map_err(|source| Error::collaborator("update_record", &fingerprint, source));
        }

        record.add_tag(TAG_NEEDS_EDIT);
        tracing::debug!(
            fingerprint = %fingerprint,
            tags = ?record.tags,
            "Creating external record"
        );
        let created = self
            .database
            .create_record(&RecordFields::from(&record))
            .await
            .map_err(|source| Error::collaborator("create_record", &fingerprint, source))?;

        // The record already exists upstream; a failed write here is reported, not rolled back.
        if let Err(source) = self.store.set(&mapping_key, &created.id).await {
            tracing::error!(
                fingerprint = %fingerprint,
                record_id = %created.id,
                error = %source,
                "External record created but mapping write failed"
            );
            return Err(Error::store("save_mapping", source));
        }

        tracing::info!(
            fingerprint = %fingerprint,
            title = %record.title,
            record_id = %created.id,
            "External record created"
        );
        Ok(created)
    }
}
