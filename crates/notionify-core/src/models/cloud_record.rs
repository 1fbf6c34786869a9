//! Cloud record model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provider tag for files that live in Dropbox
pub const PROVIDER_DROPBOX: &str = "dropbox";

/// Tag appended to every record created by the sync engine, so a human
/// reviewer can tell machine-generated entries apart from curated ones.
pub const TAG_NEEDS_EDIT: &str = "needs edit";

/// Stable identity of a cloud file: `provider:file_id`.
///
/// Independent of title, URL and tags, so it survives renames and moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    provider: String,
    file_id: String,
}

impl Fingerprint {
    #[must_use]
    pub fn new(provider: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            file_id: file_id.into(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Key under which the mapping `fingerprint -> record id` is stored.
    #[must_use]
    pub fn mapping_key(&self) -> String {
        format!("cloudfile-{}-{}", self.provider, self.file_id)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.file_id)
    }
}

/// Key under which the listing cursor of `path` is stored.
#[must_use]
pub fn cursor_key(provider: &str, path: &str) -> String {
    format!("cursor-{provider}-{path}")
}

/// A file as seen in the source storage.
///
/// Built fresh from every diff entry and never persisted; only its
/// fingerprint and the resulting record id are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudRecord {
    /// Provider-assigned id, stable across renames
    pub file_id: String,
    /// Display title
    pub title: String,
    /// Durable preview link
    pub url: String,
    /// Ordered set of tags
    pub tags: Vec<String>,
    /// Source collaborator, e.g. `dropbox`
    pub provider: String,
}

impl CloudRecord {
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        file_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            title: title.into(),
            url: url.into(),
            tags: Vec::new(),
            provider: provider.into(),
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(&self.provider, &self.file_id)
    }

    /// Append `tag` unless it is already present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags.iter().any(|existing| existing == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }
}
