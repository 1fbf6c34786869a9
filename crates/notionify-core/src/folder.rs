//! Folder-level sync: diff, per-file sync, all-or-nothing cursor advance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use crate::diff::FolderDiffSource;
use crate::engine::RecordSyncEngine;
use crate::error::{BatchFailure, Error, Result};
use crate::models::{Entry, ExternalRecord};

/// What one `sync_folder` run produced.
#[derive(Debug, Default)]
pub struct FolderSyncOutcome {
    /// Records created or updated, in listing order
    pub records: Vec<ExternalRecord>,
    /// Per-entry errors; `None` when every entry succeeded
    pub failure: Option<BatchFailure>,
    /// Whether the stored cursor moved forward
    pub cursor_advanced: bool,
    pub folders_seen: usize,
    pub deletions_seen: usize,
}

impl FolderSyncOutcome {
    pub const fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Collapse into the records, or a `PartialBatchFailure` if anything failed.
    pub fn into_result(self) -> Result<Vec<ExternalRecord>> {
        match self.failure {
            None => Ok(self.records),
            Some(failure) => Err(Error::PartialBatchFailure(failure)),
        }
    }
}

/// Per-path async locks so overlapping triggers for one folder run one after another.
#[derive(Clone, Default)]
struct FolderLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl FolderLocks {
    async fn lock(&self, path: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(path.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Drives a whole folder through the diff source and the record sync engine.
#[derive(Clone)]
pub struct FolderSynchronizer {
    diff: FolderDiffSource,
    engine: Arc<RecordSyncEngine>,
    locks: FolderLocks,
}

impl FolderSynchronizer {
    pub fn new(diff: FolderDiffSource, engine: Arc<RecordSyncEngine>) -> Self {
        Self {
            diff,
            engine,
            locks: FolderLocks::default(),
        }
    }

    pub const fn engine(&self) -> &Arc<RecordSyncEngine> {
        &self.engine
    }

    /// Sync every change of `path` since the stored cursor.
    ///
    /// Entries are processed sequentially and a failing entry never stops the
    /// batch. The cursor is advanced only when every entry succeeded, so the
    /// next run re-attempts the same window otherwise. Returns `Err` only when
    /// the cursor could not be read or the listing failed.
    pub async fn sync_folder(&self, path: &str) -> Result<FolderSyncOutcome> {
        let _folder_lock = self.locks.lock(path).await;

        let cursor = self.diff.load_cursor(path).await?;
        let changes = self.diff.list_changes(path, cursor.as_deref()).await?;

        let mut outcome = FolderSyncOutcome::default();
        let mut failure = BatchFailure::default();
        for entry in &changes.entries {
            let entry_path = entry.path_display();
            match entry {
                Entry::FileChanged(file) => {
                    tracing::info!(path = entry_path, id = %file.id, "Cloud file changed");
                    let synced = match self.diff.build_record(file).await {
                        Ok(record) => self.engine.sync(record).await,
                        Err(error) => Err(error),
                    };
                    match synced {
                        Ok(record) => outcome.records.push(record),
                        Err(error) => {
                            tracing::error!(path = entry_path, error = %error, "File sync failed");
                            failure.push(error);
                        }
                    }
                }
                Entry::FolderChanged { id, .. } => {
                    tracing::info!(path = entry_path, id = %id, "Cloud folder changed");
                    outcome.folders_seen += 1;
                }
                Entry::Deleted { .. } => {
                    tracing::info!(path = entry_path, "Cloud entry deleted");
                    outcome.deletions_seen += 1;
                }
            }
        }

        if failure.is_empty() && cursor.as_deref() != Some(changes.cursor.as_str()) {
            match self.diff.save_cursor(path, &changes.cursor).await {
                Ok(()) => outcome.cursor_advanced = true,
                Err(error) => failure.push(error),
            }
        } else if !failure.is_empty() {
            tracing::warn!(
                path,
                failed = failure.len(),
                "Cursor not advanced; failed entries will be retried"
            );
        }

        outcome.failure = failure.into_option();
        Ok(outcome)
    }
}
