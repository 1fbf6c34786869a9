//! Dropbox HTTP API v2 client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{CloudStorage, CollaboratorResult, ListPage};
use crate::error::CollaboratorError;
use crate::http::{build_client, ensure_success};
use crate::models::{Entry, FileMetadata, PROVIDER_DROPBOX};

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";

/// Connection settings for [`DropboxClient`].
#[derive(Clone)]
pub struct DropboxConfig {
    pub token: String,
    pub api_url: String,
    pub content_url: String,
    pub timeout: Duration,
}

impl DropboxConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for DropboxConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DropboxConfig")
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DropboxClient {
    client: reqwest::Client,
    config: DropboxConfig,
}

impl DropboxClient {
    pub fn new(config: DropboxConfig) -> CollaboratorResult<Self> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        route: &str,
        body: serde_json::Value,
    ) -> CollaboratorResult<T> {
        let url = format!("{}/2/{route}", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        response.json::<T>().await.map_err(|error| {
            CollaboratorError::InvalidPayload(format!(
                "{route}: {}",
                crate::http::sanitize(&error)
            ))
        })
    }

    fn content_request(&self, route: &str, arg: &serde_json::Value) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/2/{route}",
            self.config.content_url.trim_end_matches('/')
        );
        self.client
            .post(url)
            .bearer_auth(&self.config.token)
            .header("Dropbox-API-Arg", header_safe_json(arg))
    }
}

/// Serialize `arg` for the `Dropbox-API-Arg` header. Header values must be
/// ASCII, so every non-ASCII character becomes a `\uXXXX` escape (surrogate
/// pairs outside the basic plane).
fn header_safe_json(arg: &serde_json::Value) -> String {
    let json = arg.to_string();
    let mut escaped = String::with_capacity(json.len());
    for character in json.chars() {
        if character.is_ascii() {
            escaped.push(character);
            continue;
        }
        let mut units = [0u16; 2];
        for unit in character.encode_utf16(&mut units) {
            escaped.push_str(&format!("\\u{unit:04x}"));
        }
    }
    escaped
}

/// Overwrite: a retry after a failed relink replaces the earlier upload and
/// keeps its file id instead of failing with a path conflict.
fn upload_arg(path: &str) -> serde_json::Value {
    json!({ "path": path, "mode": "overwrite", "autorename": false })
}

#[async_trait]
impl CloudStorage for DropboxClient {
    fn provider(&self) -> &str {
        PROVIDER_DROPBOX
    }

    async fn list_folder(&self, path: &str) -> CollaboratorResult<ListPage> {
        let page: ListFolderResponse = self
            .rpc("files/list_folder", json!({ "path": path }))
            .await?;
        Ok(page.into())
    }

    async fn list_folder_continue(&self, cursor: &str) -> CollaboratorResult<ListPage> {
        let page: ListFolderResponse = self
            .rpc("files/list_folder/continue", json!({ "cursor": cursor }))
            .await?;
        Ok(page.into())
    }

    // TODO: switch to sharing/get_file_metadata/batch once listings get large
    async fn shared_link(&self, path_lower: &str) -> CollaboratorResult<String> {
        let metadata: SharedFileMetadata = self
            .rpc("sharing/get_file_metadata", json!({ "file": path_lower }))
            .await?;
        Ok(metadata.preview_url)
    }

    async fn download(&self, path_lower: &str) -> CollaboratorResult<Vec<u8>> {
        let response = self
            .content_request("files/download", &json!({ "path": path_lower }))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(&self, path: &str, content: Vec<u8>) -> CollaboratorResult<FileMetadata> {
        let response = self
            .content_request("files/upload", &upload_arg(path))
            .header("Content-Type", "application/octet-stream")
            .body(content)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let uploaded = response.json::<UploadedFile>().await.map_err(|error| {
            CollaboratorError::InvalidPayload(format!(
                "files/upload: {}",
                crate::http::sanitize(&error)
            ))
        })?;
        Ok(uploaded.into())
    }
}

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<RawEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum RawEntry {
    File {
        id: String,
        path_display: Option<String>,
        path_lower: Option<String>,
    },
    Folder {
        id: String,
        path_display: Option<String>,
    },
    Deleted {
        path_display: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl RawEntry {
    fn into_entry(self) -> Option<Entry> {
        match self {
            Self::File {
                id,
                path_display,
                path_lower,
            } => {
                let path_display = path_display.unwrap_or_default();
                let path_lower = path_lower.unwrap_or_else(|| path_display.to_lowercase());
                Some(Entry::FileChanged(FileMetadata {
                    id,
                    path_display,
                    path_lower,
                }))
            }
            Self::Folder { id, path_display } => Some(Entry::FolderChanged {
                id,
                path_display: path_display.unwrap_or_default(),
            }),
            Self::Deleted { path_display } => Some(Entry::Deleted {
                path_display: path_display.unwrap_or_default(),
            }),
            Self::Unknown => None,
        }
    }
}

impl From<ListFolderResponse> for ListPage {
    fn from(response: ListFolderResponse) -> Self {
        Self {
            entries: response
                .entries
                .into_iter()
                .filter_map(RawEntry::into_entry)
                .collect(),
            cursor: response.cursor,
            has_more: response.has_more,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SharedFileMetadata {
    preview_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
    path_display: Option<String>,
    path_lower: Option<String>,
}

impl From<UploadedFile> for FileMetadata {
    fn from(file: UploadedFile) -> Self {
        let path_display = file.path_display.unwrap_or_default();
        Self {
            id: file.id,
            path_lower: file
                .path_lower
                .unwrap_or_else(|| path_display.to_lowercase()),
            path_display,
        }
    }
}
