//! Data models for Notionify

mod cloud_record;
mod entry;
mod external_record;

pub use cloud_record::{cursor_key, CloudRecord, Fingerprint, PROVIDER_DROPBOX, TAG_NEEDS_EDIT};
pub use entry::{Entry, FileMetadata};
pub use external_record::{ExternalRecord, RecordFields, RECORD_TYPE_PAPER};
