//! Folder listing entries

use serde::{Deserialize, Serialize};

/// Metadata of a file as reported by the storage listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    pub path_display: String,
    pub path_lower: String,
}

/// One change reported by the storage listing since the previous cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    FileChanged(FileMetadata),
    FolderChanged { id: String, path_display: String },
    Deleted { path_display: String },
}

impl Entry {
    /// Display path of the changed entry, whatever its kind.
    pub fn path_display(&self) -> &str {
        match self {
            Self::FileChanged(file) => &file.path_display,
            Self::FolderChanged { path_display, .. } | Self::Deleted { path_display } => {
                path_display
            }
        }
    }
}
