use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use notionify_core::database::{NotionConfig, DEFAULT_NOTION_API_URL};
use notionify_core::storage::{DropboxConfig, DEFAULT_DROPBOX_API_URL, DEFAULT_DROPBOX_CONTENT_URL};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub dropbox_token: String,
    pub dropbox_root_folder: String,
    pub dropbox_app_secret: Option<String>,
    pub dropbox_api_url: String,
    pub dropbox_content_url: String,
    pub notion_token: String,
    pub notion_database_id: String,
    pub notion_api_url: String,
    pub mapping_db_path: String,
    pub http_timeout: Duration,
    pub poll_interval: Option<Duration>,
    pub reverse_sync_folder: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("dropbox_token", &"[REDACTED]")
            .field("dropbox_root_folder", &self.dropbox_root_folder)
            .field(
                "dropbox_app_secret",
                &self.dropbox_app_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("dropbox_api_url", &self.dropbox_api_url)
            .field("dropbox_content_url", &self.dropbox_content_url)
            .field("notion_token", &"[REDACTED]")
            .field("notion_database_id", &self.notion_database_id)
            .field("notion_api_url", &self.notion_api_url)
            .field("mapping_db_path", &self.mapping_db_path)
            .field("http_timeout", &self.http_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("reverse_sync_folder", &self.reverse_sync_folder)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "NOTIONIFY_BIND_ADDR", "127.0.0.1:8080");

        let dropbox_token = required_trimmed(&lookup, "DROPBOX_TOKEN")?;
        // Empty is the Dropbox app-folder root, so it only has to be present.
        let dropbox_root_folder = lookup("DROPBOX_ROOT_FOLDER")
            .map(|value| value.trim().to_string())
            .ok_or(ConfigError::MissingVar("DROPBOX_ROOT_FOLDER"))?;
        if !dropbox_root_folder.is_empty() && !dropbox_root_folder.starts_with('/') {
            return Err(ConfigError::Invalid(
                "DROPBOX_ROOT_FOLDER must be empty or an absolute path starting with /"
                    .to_string(),
            ));
        }
        let dropbox_app_secret = optional_trimmed(&lookup, "DROPBOX_APP_SECRET");

        let dropbox_api_url =
            http_url_or_default(&lookup, "DROPBOX_API_URL", DEFAULT_DROPBOX_API_URL)?;
        let dropbox_content_url =
            http_url_or_default(&lookup, "DROPBOX_CONTENT_URL", DEFAULT_DROPBOX_CONTENT_URL)?;

        let notion_token = required_trimmed(&lookup, "NOTION_TOKEN")?;
        let notion_database_id = required_trimmed(&lookup, "NOTION_DATABASE_ID")?;
        let notion_api_url =
            http_url_or_default(&lookup, "NOTION_API_URL", DEFAULT_NOTION_API_URL)?;

        let mapping_db_path = value_or_default(&lookup, "MAPPING_DB_PATH", "notionify.db");

        let http_timeout_secs = value_or_default(&lookup, "HTTP_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid("HTTP_TIMEOUT_SECS must be an integer in [1, 300]".to_string())
            })?;
        if !(1..=300).contains(&http_timeout_secs) {
            return Err(ConfigError::Invalid(
                "HTTP_TIMEOUT_SECS must be in [1, 300]".to_string(),
            ));
        }

        let poll_interval = match optional_trimmed(&lookup, "SYNC_POLL_INTERVAL_SECS") {
            None => None,
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    ConfigError::Invalid(
                        "SYNC_POLL_INTERVAL_SECS must be an integer in [10, 86400]".to_string(),
                    )
                })?;
                if !(10..=86_400).contains(&secs) {
                    return Err(ConfigError::Invalid(
                        "SYNC_POLL_INTERVAL_SECS must be in [10, 86400]".to_string(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
        };

        let reverse_sync_folder = optional_trimmed(&lookup, "REVERSE_SYNC_FOLDER");
        if let Some(folder) = reverse_sync_folder.as_deref() {
            if !folder.starts_with('/') {
                return Err(ConfigError::Invalid(
                    "REVERSE_SYNC_FOLDER must be an absolute path starting with /".to_string(),
                ));
            }
        }

        Ok(Self {
            bind_addr,
            dropbox_token,
            dropbox_root_folder,
            dropbox_app_secret,
            dropbox_api_url,
            dropbox_content_url,
            notion_token,
            notion_database_id,
            notion_api_url,
            mapping_db_path,
            http_timeout: Duration::from_secs(http_timeout_secs),
            poll_interval,
            reverse_sync_folder,
        })
    }

    pub fn dropbox(&self) -> DropboxConfig {
        DropboxConfig {
            token: self.dropbox_token.clone(),
            api_url: self.dropbox_api_url.clone(),
            content_url: self.dropbox_content_url.clone(),
            timeout: self.http_timeout,
        }
    }

    pub fn notion(&self) -> NotionConfig {
        NotionConfig {
            token: self.notion_token.clone(),
            database_id: self.notion_database_id.clone(),
            api_url: self.notion_api_url.clone(),
            timeout: self.http_timeout,
        }
    }
}

fn http_url_or_default(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let value = value_or_default(lookup, name, default);
    if !is_http_url(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must start with http:// or https://"
        )));
    }
    Ok(trim_trailing(&value).to_string())
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}
