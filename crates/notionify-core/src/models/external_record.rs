//! External database record model

use serde::{Deserialize, Serialize};

/// Record type the reverse-direction flow mirrors back into storage
pub const RECORD_TYPE_PAPER: &str = "paper";

/// The mirrored entity in the external database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    /// Opaque id assigned by the database on creation
    pub id: String,
    pub name: String,
    /// Classification field, e.g. `paper`
    pub record_type: Option<String>,
    pub url: Option<String>,
}

/// Fields sent when creating a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub name: String,
    pub tags: Vec<String>,
    pub url: String,
}

impl From<&crate::models::CloudRecord> for RecordFields {
    fn from(record: &crate::models::CloudRecord) -> Self {
        Self {
            name: record.title.clone(),
            tags: record.tags.clone(),
            url: record.url.clone(),
        }
    }
}
