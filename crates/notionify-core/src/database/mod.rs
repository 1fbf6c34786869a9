//! Structured-database collaborator.

mod notion;

use async_trait::async_trait;

use crate::models::{ExternalRecord, RecordFields};
use crate::storage::CollaboratorResult;

pub use notion::{NotionClient, NotionConfig, DEFAULT_API_URL as DEFAULT_NOTION_API_URL};

/// Sort direction for [`RecordSort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSort {
    pub property: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Only records whose classification equals the given value
    TypeEquals(String),
}

/// One page request against the record listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub filter: Option<RecordFilter>,
    pub sorts: Vec<RecordSort>,
    pub start_cursor: Option<String>,
}

impl RecordQuery {
    /// All records, oldest first.
    #[must_use]
    pub fn oldest_first() -> Self {
        Self {
            filter: None,
            sorts: vec![RecordSort {
                property: "Created".to_string(),
                direction: SortDirection::Ascending,
            }],
            start_cursor: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<ExternalRecord>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Operations the sync core needs from the external database.
#[async_trait]
pub trait RecordDatabase: Send + Sync {
    async fn create_record(&self, fields: &RecordFields) -> CollaboratorResult<ExternalRecord>;

    /// Update only the `url` field; every other field is left as curated.
    async fn update_record_url(
        &self,
        record_id: &str,
        url: &str,
    ) -> CollaboratorResult<ExternalRecord>;

    async fn list_records(&self, query: &RecordQuery) -> CollaboratorResult<RecordPage>;
}

/// Drain every page of `query`.
pub async fn list_all_records(
    database: &dyn RecordDatabase,
    mut query: RecordQuery,
) -> CollaboratorResult<Vec<ExternalRecord>> {
    let mut records = Vec::new();
    loop {
        let page = database.list_records(&query).await?;
        records.extend(page.records);
        match page.next_cursor {
            Some(cursor) if page.has_more => query.start_cursor = Some(cursor),
            _ => break,
        }
    }
    Ok(records)
}
