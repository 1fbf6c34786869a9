//! Cloud-storage collaborator.

mod dropbox;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::models::{Entry, FileMetadata};

pub use dropbox::{
    DropboxClient, DropboxConfig, DEFAULT_API_URL as DEFAULT_DROPBOX_API_URL,
    DEFAULT_CONTENT_URL as DEFAULT_DROPBOX_CONTENT_URL,
};

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub entries: Vec<Entry>,
    pub cursor: String,
    pub has_more: bool,
}

/// Operations the sync core needs from the cloud storage.
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Provider tag that prefixes every fingerprint, e.g. `dropbox`.
    fn provider(&self) -> &str;

    /// First page of the (non-recursive) listing of `path`.
    async fn list_folder(&self, path: &str) -> CollaboratorResult<ListPage>;

    /// Next page of changes after `cursor`.
    async fn list_folder_continue(&self, cursor: &str) -> CollaboratorResult<ListPage>;

    /// Shareable preview link for the file at `path_lower`.
    async fn shared_link(&self, path_lower: &str) -> CollaboratorResult<String>;

    async fn download(&self, path_lower: &str) -> CollaboratorResult<Vec<u8>>;

    async fn upload(&self, path: &str, content: Vec<u8>) -> CollaboratorResult<FileMetadata>;
}
