//! In-process collaborators for engine and folder scenarios.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notionify_core::database::{RecordFilter, RecordPage, RecordQuery};
use notionify_core::diff::FolderDiffSource;
use notionify_core::folder::FolderSynchronizer;
use notionify_core::models::{Entry, ExternalRecord, FileMetadata, RecordFields};
use notionify_core::storage::{CollaboratorResult, ListPage};
use notionify_core::{
    CloudStorage, CollaboratorError, MappingStore, RecordDatabase, RecordSyncEngine, StoreError,
};
use tokio::sync::Semaphore;

pub const ROOT: &str = "/Papers";

pub fn file(id: &str, path_display: &str) -> Entry {
    Entry::FileChanged(file_metadata(id, path_display))
}

pub fn file_metadata(id: &str, path_display: &str) -> FileMetadata {
    FileMetadata {
        id: id.to_string(),
        path_display: path_display.to_string(),
        path_lower: path_display.to_lowercase(),
    }
}

fn api_error(status: u16, message: &str) -> CollaboratorError {
    CollaboratorError::Api {
        status,
        message: message.to_string(),
    }
}

/// Scripted cloud storage. Listing pages are keyed by the cursor they continue
/// from (`None` for the initial listing); an unknown cursor is caught up.
#[derive(Default)]
pub struct FakeStorage {
    pages: Mutex<HashMap<Option<String>, CollaboratorResult<ListPage>>>,
    links: Mutex<HashMap<String, String>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<(String, usize)>>,
    uploaded_ids: Mutex<HashMap<String, String>>,
    link_gate: Mutex<Option<Arc<Semaphore>>>,
    list_calls: AtomicUsize,
    link_calls: AtomicUsize,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, from: Option<&str>, entries: Vec<Entry>, cursor: &str, has_more: bool) {
        self.pages.lock().unwrap().insert(
            from.map(ToOwned::to_owned),
            Ok(ListPage {
                entries,
                cursor: cursor.to_string(),
                has_more,
            }),
        );
    }

    pub fn fail_page(&self, from: Option<&str>) {
        self.pages.lock().unwrap().insert(
            from.map(ToOwned::to_owned),
            Err(api_error(409, "reset")),
        );
    }

    pub fn set_link(&self, path_lower: &str, link: &str) {
        self.links
            .lock()
            .unwrap()
            .insert(path_lower.to_string(), link.to_string());
    }

    pub fn set_download(&self, path_lower: &str, bytes: &[u8]) {
        self.downloads
            .lock()
            .unwrap()
            .insert(path_lower.to_string(), bytes.to_vec());
    }

    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn link_calls(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }

    /// Hold the next `shared_link` call until the returned semaphore gets a permit.
    pub fn gate_next_link(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.link_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn page(&self, from: Option<&str>) -> CollaboratorResult<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let key = from.map(ToOwned::to_owned);
        match self.pages.lock().unwrap().get(&key) {
            Some(page) => page.clone(),
            None => match from {
                Some(cursor) => Ok(ListPage {
                    entries: Vec::new(),
                    cursor: cursor.to_string(),
                    has_more: false,
                }),
                None => Err(api_error(404, "path/not_found")),
            },
        }
    }
}

#[async_trait]
impl CloudStorage for FakeStorage {
    fn provider(&self) -> &str {
        "dropbox"
    }

    async fn list_folder(&self, _path: &str) -> CollaboratorResult<ListPage> {
        self.page(None)
    }

    async fn list_folder_continue(&self, cursor: &str) -> CollaboratorResult<ListPage> {
        self.page(Some(cursor))
    }

    async fn shared_link(&self, path_lower: &str) -> CollaboratorResult<String> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.link_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            drop(gate.acquire().await.unwrap());
        }
        self.links
            .lock()
            .unwrap()
            .get(path_lower)
            .cloned()
            .ok_or_else(|| api_error(409, "shared_link_access_denied"))
    }

    async fn download(&self, path_lower: &str) -> CollaboratorResult<Vec<u8>> {
        self.downloads
            .lock()
            .unwrap()
            .get(path_lower)
            .cloned()
            .ok_or_else(|| api_error(409, "download/not_found"))
    }

    /// Overwrites in place: a second upload to the same path keeps the file id.
    async fn upload(&self, path: &str, content: Vec<u8>) -> CollaboratorResult<FileMetadata> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), content.len()));
        let path_lower = path.to_lowercase();
        let mut ids = self.uploaded_ids.lock().unwrap();
        let number = ids.len() + 1;
        let id = ids
            .entry(path_lower.clone())
            .or_insert_with(|| format!("id:upload-{number}"))
            .clone();
        let number = id.trim_start_matches("id:upload-").to_string();
        self.links.lock().unwrap().insert(
            path_lower,
            format!("https://www.dropbox.com/s/{number}?dl=0"),
        );
        Ok(file_metadata(&id, path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub record: ExternalRecord,
    pub tags: Vec<String>,
}

/// External database that keeps records in memory and logs every call.
#[derive(Default)]
pub struct FakeDatabase {
    records: Mutex<Vec<StoredRecord>>,
    updates: Mutex<Vec<(String, String)>>,
    fail_create_for: Mutex<HashSet<String>>,
    fail_updates: AtomicBool,
    creates: AtomicUsize,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ExternalRecord, tags: &[&str]) {
        self.records.lock().unwrap().push(StoredRecord {
            record,
            tags: tags.iter().map(|tag| (*tag).to_string()).collect(),
        });
    }

    /// Simulate a reviewer removing every tag by hand.
    pub fn clear_tags(&self, id: &str) {
        if let Some(stored) = self
            .records
            .lock()
            .unwrap()
            .iter_mut()
            .find(|stored| stored.record.id == id)
        {
            stored.tags.clear();
        }
    }

    /// Make `create_record` fail for records named `name`.
    pub fn fail_create_for(&self, name: &str) {
        self.fail_create_for
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn record(&self, id: &str) -> Option<StoredRecord> {
        self.records()
            .into_iter()
            .find(|stored| stored.record.id == id)
    }
}

#[async_trait]
impl RecordDatabase for FakeDatabase {
    async fn create_record(&self, fields: &RecordFields) -> CollaboratorResult<ExternalRecord> {
        if self.fail_create_for.lock().unwrap().contains(&fields.name) {
            return Err(api_error(500, "internal_server_error"));
        }
        let count = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        let record = ExternalRecord {
            id: format!("page-{count}"),
            name: fields.name.clone(),
            record_type: None,
            url: Some(fields.url.clone()),
        };
        self.records.lock().unwrap().push(StoredRecord {
            record: record.clone(),
            tags: fields.tags.clone(),
        });
        Ok(record)
    }

    async fn update_record_url(
        &self,
        record_id: &str,
        url: &str,
    ) -> CollaboratorResult<ExternalRecord> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(api_error(502, "bad_gateway"));
        }
        self.updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), url.to_string()));
        let mut records = self.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|stored| stored.record.id == record_id)
            .ok_or_else(|| api_error(404, "object_not_found"))?;
        stored.record.url = Some(url.to_string());
        Ok(stored.record.clone())
    }

    async fn list_records(&self, query: &RecordQuery) -> CollaboratorResult<RecordPage> {
        let records = self
            .records()
            .into_iter()
            .map(|stored| stored.record)
            .filter(|record| match &query.filter {
                Some(RecordFilter::TypeEquals(value)) => {
                    record.record_type.as_deref() == Some(value.as_str())
                }
                None => true,
            })
            .collect();
        Ok(RecordPage {
            records,
            next_cursor: None,
            has_more: false,
        })
    }
}

/// Hash-map mapping store with switchable failures.
#[derive(Default)]
pub struct FakeStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl MappingStore for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        self.put(key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub struct Harness {
    pub storage: Arc<FakeStorage>,
    pub database: Arc<FakeDatabase>,
    pub store: Arc<FakeStore>,
    pub engine: Arc<RecordSyncEngine>,
    pub folder: FolderSynchronizer,
}

impl Harness {
    pub fn new() -> Self {
        let storage = Arc::new(FakeStorage::new());
        let database = Arc::new(FakeDatabase::new());
        let store = Arc::new(FakeStore::new());

        let engine = Arc::new(RecordSyncEngine::new(
            database.clone() as Arc<dyn RecordDatabase>,
            store.clone() as Arc<dyn MappingStore>,
        ));
        let diff = FolderDiffSource::new(
            storage.clone() as Arc<dyn CloudStorage>,
            store.clone() as Arc<dyn MappingStore>,
        );
        let folder = FolderSynchronizer::new(diff, Arc::clone(&engine));

        Self {
            storage,
            database,
            store,
            engine,
            folder,
        }
    }

    pub fn stored_cursor(&self) -> Option<String> {
        self.store.value(&format!("cursor-dropbox-{ROOT}"))
    }
}
