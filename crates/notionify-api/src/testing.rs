//! Collaborator fakes for router and poller tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notionify_core::database::{RecordPage, RecordQuery};
use notionify_core::models::{Entry, ExternalRecord, FileMetadata, RecordFields};
use notionify_core::storage::{CollaboratorResult, ListPage};
use notionify_core::store::LibSqlMappingStore;
use notionify_core::{CloudStorage, CollaboratorError, MappingStore, RecordDatabase};

use crate::config::AppConfig;
use crate::routes::AppState;

const LISTING_OK: u8 = 0;
const LISTING_PANICS: u8 = 1;
const LISTING_FAILS: u8 = 2;

/// Storage holding a single file, `/Papers/note.txt`.
#[derive(Default)]
pub struct OneFileStorage {
    list_calls: AtomicUsize,
    next_listing: AtomicU8,
}

impl OneFileStorage {
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Make the next `list_folder` call panic; later calls succeed again.
    pub fn panic_on_next_listing(&self) {
        self.next_listing.store(LISTING_PANICS, Ordering::SeqCst);
    }

    /// Make the next `list_folder` call return an API error.
    pub fn fail_next_listing(&self) {
        self.next_listing.store(LISTING_FAILS, Ordering::SeqCst);
    }
}

#[async_trait]
impl CloudStorage for OneFileStorage {
    fn provider(&self) -> &str {
        "dropbox"
    }

    async fn list_folder(&self, _path: &str) -> CollaboratorResult<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_listing.swap(LISTING_OK, Ordering::SeqCst) {
            LISTING_PANICS => panic!("listing exploded"),
            LISTING_FAILS => {
                return Err(CollaboratorError::Api {
                    status: 503,
                    message: "too_many_requests".to_string(),
                });
            }
            _ => {}
        }
        Ok(ListPage {
            entries: vec![Entry::FileChanged(FileMetadata {
                id: "id:note".to_string(),
                path_display: "/Papers/note.txt".to_string(),
                path_lower: "/papers/note.txt".to_string(),
            })],
            cursor: "c1".to_string(),
            has_more: false,
        })
    }

    async fn list_folder_continue(&self, cursor: &str) -> CollaboratorResult<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ListPage {
            entries: Vec::new(),
            cursor: cursor.to_string(),
            has_more: false,
        })
    }

    async fn shared_link(&self, _path_lower: &str) -> CollaboratorResult<String> {
        Ok("https://www.dropbox.com/s/n/note.txt?dl=0".to_string())
    }

    async fn download(&self, _path_lower: &str) -> CollaboratorResult<Vec<u8>> {
        Err(CollaboratorError::Api {
            status: 409,
            message: "download/not_found".to_string(),
        })
    }

    async fn upload(&self, _path: &str, _content: Vec<u8>) -> CollaboratorResult<FileMetadata> {
        Err(CollaboratorError::Api {
            status: 403,
            message: "read only".to_string(),
        })
    }
}

#[derive(Default)]
pub struct CountingDatabase {
    creates: AtomicUsize,
}

impl CountingDatabase {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordDatabase for CountingDatabase {
    async fn create_record(&self, fields: &RecordFields) -> CollaboratorResult<ExternalRecord> {
        let count = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ExternalRecord {
            id: format!("page-{count}"),
            name: fields.name.clone(),
            record_type: None,
            url: Some(fields.url.clone()),
        })
    }

    async fn update_record_url(
        &self,
        record_id: &str,
        url: &str,
    ) -> CollaboratorResult<ExternalRecord> {
        Ok(ExternalRecord {
            id: record_id.to_string(),
            name: String::new(),
            record_type: None,
            url: Some(url.to_string()),
        })
    }

    async fn list_records(&self, _query: &RecordQuery) -> CollaboratorResult<RecordPage> {
        Ok(RecordPage {
            records: Vec::new(),
            next_cursor: None,
            has_more: false,
        })
    }
}

pub struct Fakes {
    pub storage: Arc<OneFileStorage>,
    pub database: Arc<CountingDatabase>,
    pub store: Arc<LibSqlMappingStore>,
}

pub fn test_config(app_secret: Option<&str>) -> AppConfig {
    let mut values = HashMap::from([
        ("DROPBOX_TOKEN", "dropbox-token"),
        ("DROPBOX_ROOT_FOLDER", "/Papers"),
        ("NOTION_TOKEN", "notion-token"),
        ("NOTION_DATABASE_ID", "db-123"),
    ]);
    if let Some(secret) = app_secret {
        values.insert("DROPBOX_APP_SECRET", secret);
    }
    AppConfig::from_lookup(|key| values.get(key).map(|value| (*value).to_string())).unwrap()
}

pub async fn test_state(app_secret: Option<&str>) -> (AppState, Fakes) {
    let fakes = Fakes {
        storage: Arc::new(OneFileStorage::default()),
        database: Arc::new(CountingDatabase::default()),
        store: Arc::new(LibSqlMappingStore::open_in_memory().await.unwrap()),
    };
    let state = AppState::new(
        Arc::new(test_config(app_secret)),
        fakes.storage.clone() as Arc<dyn CloudStorage>,
        fakes.database.clone() as Arc<dyn RecordDatabase>,
        fakes.store.clone() as Arc<dyn MappingStore>,
        None,
    );
    (state, fakes)
}

/// Poll `condition` for up to two seconds.
pub async fn wait_for(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
