//! Reverse-direction flow: pull papers referenced by external records into storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::database::{list_all_records, RecordDatabase, RecordQuery};
use crate::diff::FolderDiffSource;
use crate::error::{Error, Result};
use crate::guard::InFlightGuard;
use crate::http::{build_client, ensure_success};
use crate::models::{CloudRecord, ExternalRecord, Fingerprint, RECORD_TYPE_PAPER};
use crate::storage::{CloudStorage, CollaboratorResult};
use crate::store::MappingStore;

/// Links under this prefix already point at the storage provider.
const STORAGE_LINK_PREFIX: &str = "https://www.dropbox.com/";

/// Fetches the document an external record links to.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> CollaboratorResult<Vec<u8>>;
}

/// Plain HTTP GET fetcher.
#[derive(Debug, Clone)]
pub struct HttpContentFetcher {
    client: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new(timeout: Duration) -> CollaboratorResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> CollaboratorResult<Vec<u8>> {
        let response = ensure_success(self.client.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Uploads the documents behind external `paper` records into a storage folder
/// and points the records at their new storage links.
pub struct DatabaseSyncer {
    cloud_folder: String,
    database: Arc<dyn RecordDatabase>,
    storage: Arc<dyn CloudStorage>,
    store: Arc<dyn MappingStore>,
    fetcher: Arc<dyn ContentFetcher>,
    diff: FolderDiffSource,
    guard: InFlightGuard,
}

impl DatabaseSyncer {
    pub fn new(
        cloud_folder: impl Into<String>,
        database: Arc<dyn RecordDatabase>,
        storage: Arc<dyn CloudStorage>,
        store: Arc<dyn MappingStore>,
        fetcher: Arc<dyn ContentFetcher>,
        guard: InFlightGuard,
    ) -> Self {
        let diff = FolderDiffSource::new(Arc::clone(&storage), Arc::clone(&store));
        Self {
            cloud_folder: cloud_folder.into(),
            database,
            storage,
            store,
            fetcher,
            diff,
            guard,
        }
    }

    /// Walk every record oldest first and upload the eligible ones.
    ///
    /// Stops at the first failure; records already handled keep their new links.
    pub async fn sync_database(&self) -> Result<Vec<CloudRecord>> {
        let records = list_all_records(self.database.as_ref(), RecordQuery::oldest_first())
            .await
            .map_err(|source| Error::collaborator("list_records", "database", source))?;

        let mut uploaded = Vec::new();
        for record in &records {
            tracing::debug!(
                record_id = %record.id,
                name = %record.name,
                "Inspecting external record"
            );
            if let Some(cloud_record) = self.sync_record(record).await? {
                uploaded.push(cloud_record);
            }
        }
        Ok(uploaded)
    }

    async fn sync_record(&self, record: &ExternalRecord) -> Result<Option<CloudRecord>> {
        let Some(url) = upload_source(record) else {
            return Ok(None);
        };

        let content = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|source| Error::collaborator("fetch_content", url, source))?;

        let target = upload_path(&self.cloud_folder, url)?;
        let file = self
            .storage
            .upload(&target, content)
            .await
            .map_err(|source| Error::collaborator("upload", &target, source))?;

        // Claim the new file before anything else can observe it: the upload
        // itself triggers a folder notification for the same fingerprint.
        let fingerprint = Fingerprint::new(self.diff.provider(), &file.id);
        let _permit = self
            .guard
            .acquire(&fingerprint)
            .map_err(|_| Error::DuplicateInProgress {
                fingerprint: fingerprint.to_string(),
            })?;
        let cloud_record = self.diff.build_record(&file).await?;

        self.database
            .update_record_url(&record.id, &cloud_record.url)
            .await
            .map_err(|source| Error::collaborator("update_record", &fingerprint, source))?;
        self.store
            .set(&fingerprint.mapping_key(), &record.id)
            .await
            .map_err(|source| Error::store("save_mapping", source))?;

        tracing::info!(
            record_id = %record.id,
            record_name = %record.name,
            fingerprint = %fingerprint,
            title = %cloud_record.title,
            "Cloud file created from external record"
        );
        Ok(Some(cloud_record))
    }
}

/// URL to upload from, when `record` is a paper not yet stored in the cloud.
fn upload_source(record: &ExternalRecord) -> Option<&str> {
    if record.record_type.as_deref() != Some(RECORD_TYPE_PAPER) {
        return None;
    }
    let url = record.url.as_deref()?.trim();
    if url.is_empty() || url.starts_with(STORAGE_LINK_PREFIX) {
        return None;
    }
    Some(url)
}

fn upload_path(folder: &str, url: &str) -> Result<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let basename = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .ok_or_else(|| Error::InvalidInput(format!("cannot derive a file name from {url}")))?;
    Ok(format!("{}/{basename}", folder.trim_end_matches('/')))
}
