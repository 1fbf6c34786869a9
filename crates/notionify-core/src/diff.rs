//! Folder diff source: cursor-driven change listing plus cloud record derivation.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{cursor_key, CloudRecord, Entry, FileMetadata};
use crate::pdf::{extract_pdf_title, is_pdf};
use crate::storage::CloudStorage;
use crate::store::MappingStore;

/// Every change of one folder since a cursor, and the cursor to resume from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderChanges {
    pub entries: Vec<Entry>,
    pub cursor: String,
}

/// Wraps the storage listing API and the cursor stored for each folder.
#[derive(Clone)]
pub struct FolderDiffSource {
    storage: Arc<dyn CloudStorage>,
    store: Arc<dyn MappingStore>,
}

impl FolderDiffSource {
    pub fn new(storage: Arc<dyn CloudStorage>, store: Arc<dyn MappingStore>) -> Self {
        Self { storage, store }
    }

    pub fn provider(&self) -> &str {
        self.storage.provider()
    }

    fn cursor_key(&self, path: &str) -> String {
        cursor_key(self.storage.provider(), path)
    }

    /// Stored cursor for `path`; `None` means list from the beginning.
    pub async fn load_cursor(&self, path: &str) -> Result<Option<String>> {
        let cursor = self
            .store
            .get(&self.cursor_key(path))
            .await
            .map_err(|source| Error::store("load_cursor", source))?;
        if let Some(cursor) = &cursor {
            tracing::info!(path, cursor = %cursor, "Cursor loaded from mapping store");
        }
        Ok(cursor)
    }

    pub async fn save_cursor(&self, path: &str, cursor: &str) -> Result<()> {
        self.store
            .set(&self.cursor_key(path), cursor)
            .await
            .map_err(|source| Error::store("save_cursor", source))?;
        tracing::info!(path, cursor, "New cursor saved");
        Ok(())
    }

    /// Drop the stored cursor so the next listing starts from the beginning.
    /// Failures are logged; the listing error that triggered this is what callers see.
    pub async fn invalidate_cursor(&self, path: &str) {
        match self.store.delete(&self.cursor_key(path)).await {
            Ok(()) => tracing::info!(path, "Cursor invalidated"),
            Err(error) => tracing::error!(path, error = %error, "Cannot delete cursor"),
        }
    }

    /// Accumulate every page of changes since `cursor` (or from the start).
    ///
    /// On failure the stored cursor for `path` is invalidated and the error is
    /// returned without retrying.
    pub async fn list_changes(&self, path: &str, cursor: Option<&str>) -> Result<FolderChanges> {
        match self.collect_pages(path, cursor).await {
            Ok(changes) => Ok(changes),
            Err(error) => {
                self.invalidate_cursor(path).await;
                Err(error)
            }
        }
    }

    async fn collect_pages(&self, path: &str, cursor: Option<&str>) -> Result<FolderChanges> {
        let mut entries = Vec::new();
        let mut page = match cursor {
            Some(cursor) => self
                .storage
                .list_folder_continue(cursor)
                .await
                .map_err(|source| Error::collaborator("list_folder_continue", path, source))?,
            None => self
                .storage
                .list_folder(path)
                .await
                .map_err(|source| Error::collaborator("list_folder", path, source))?,
        };

        loop {
            entries.append(&mut page.entries);
            if !page.has_more {
                break;
            }
            page = self
                .storage
                .list_folder_continue(&page.cursor)
                .await
                .map_err(|source| Error::collaborator("list_folder_continue", path, source))?;
        }

        tracing::debug!(path, entries = entries.len(), "Folder listing complete");
        Ok(FolderChanges {
            entries,
            cursor: page.cursor,
        })
    }

    /// Build the cloud record for a changed file: derived title plus normalized link.
    pub async fn build_record(&self, file: &FileMetadata) -> Result<CloudRecord> {
        let link = self
            .storage
            .shared_link(&file.path_lower)
            .await
            .map_err(|source| Error::collaborator("shared_link", &file.path_display, source))?;
        let title = self.file_title(file).await;
        Ok(CloudRecord::new(
            self.storage.provider(),
            &file.id,
            title,
            normalize_link(&link),
        ))
    }

    /// Filename without extension, upgraded to the PDF `Title` metadata when readable.
    pub async fn file_title(&self, file: &FileMetadata) -> String {
        let fallback = default_title(&file.path_display);
        if !is_pdf(&file.path_lower) {
            return fallback;
        }
        self.pdf_title(file).await.unwrap_or(fallback)
    }

    async fn pdf_title(&self, file: &FileMetadata) -> Option<String> {
        let bytes = match self.storage.download(&file.path_lower).await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::debug!(path = %file.path_display, error = %error, "PDF download failed");
                return None;
            }
        };
        tokio::task::spawn_blocking(move || extract_pdf_title(&bytes))
            .await
            .ok()
            .flatten()
    }
}

/// Basename of `path_display` with its extension stripped.
pub fn default_title(path_display: &str) -> String {
    let path = Path::new(path_display);
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Strip the `?dl=0` suffix so preview and download links compare equal.
pub fn normalize_link(link: &str) -> String {
    link.strip_suffix("?dl=0").unwrap_or(link).to_string()
}
