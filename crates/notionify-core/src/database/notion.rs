//! Notion REST API client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{RecordDatabase, RecordFilter, RecordPage, RecordQuery, SortDirection};
use crate::error::CollaboratorError;
use crate::http::{build_client, ensure_success, sanitize};
use crate::models::{ExternalRecord, RecordFields};
use crate::storage::CollaboratorResult;

pub const DEFAULT_API_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

const PROP_NAME: &str = "Name";
const PROP_TAGS: &str = "Tags";
const PROP_TYPE: &str = "Type";
const PROP_URL: &str = "URL";

/// Connection settings for [`NotionClient`].
#[derive(Clone)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl NotionConfig {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            database_id: database_id.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NotionConfig")
            .field("token", &"[REDACTED]")
            .field("database_id", &self.database_id)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(config: NotionConfig) -> CollaboratorResult<Self> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/{path}", self.config.api_url.trim_end_matches('/'));
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", NOTION_VERSION)
            .header("Accept", "application/json")
    }

    async fn send_for_page(&self, request: reqwest::RequestBuilder) -> CollaboratorResult<Value> {
        let response = ensure_success(request.send().await?).await?;
        response.json::<Value>().await.map_err(|error| {
            CollaboratorError::InvalidPayload(format!("notion page: {}", sanitize(&error)))
        })
    }
}

#[async_trait]
impl RecordDatabase for NotionClient {
    async fn create_record(&self, fields: &RecordFields) -> CollaboratorResult<ExternalRecord> {
        let body = json!({
            "parent": { "database_id": self.config.database_id },
            "properties": create_properties(fields),
        });
        let page = self
            .send_for_page(self.request(reqwest::Method::POST, "pages").json(&body))
            .await?;
        parse_page(&page)
    }

    async fn update_record_url(
        &self,
        record_id: &str,
        url: &str,
    ) -> CollaboratorResult<ExternalRecord> {
        let body = json!({ "properties": url_only_properties(url) });
        let page = self
            .send_for_page(
                self.request(reqwest::Method::PATCH, &format!("pages/{record_id}"))
                    .json(&body),
            )
            .await?;
        parse_page(&page)
    }

    async fn list_records(&self, query: &RecordQuery) -> CollaboratorResult<RecordPage> {
        let path = format!("databases/{}/query", self.config.database_id);
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&query_body(query))
            .send()
            .await?;
        let payload = ensure_success(response)
            .await?
            .json::<QueryResponse>()
            .await
            .map_err(|error| {
                CollaboratorError::InvalidPayload(format!("notion query: {}", sanitize(&error)))
            })?;

        let records = payload
            .results
            .iter()
            .map(parse_page)
            .collect::<CollaboratorResult<Vec<_>>>()?;
        Ok(RecordPage {
            records,
            next_cursor: payload.next_cursor,
            has_more: payload.has_more,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

fn create_properties(fields: &RecordFields) -> Value {
    let tags: Vec<Value> = fields
        .tags
        .iter()
        .map(|tag| json!({ "name": tag }))
        .collect();
    json!({
        PROP_NAME: { "title": [ { "text": { "content": fields.name } } ] },
        PROP_TAGS: { "type": "multi_select", "multi_select": tags },
        PROP_URL: { "type": "url", "url": fields.url },
    })
}

fn url_only_properties(url: &str) -> Value {
    json!({ PROP_URL: { "type": "url", "url": url } })
}

fn query_body(query: &RecordQuery) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(RecordFilter::TypeEquals(value)) = &query.filter {
        body.insert(
            "filter".to_string(),
            json!({ "property": PROP_TYPE, "select": { "equals": value } }),
        );
    }
    if !query.sorts.is_empty() {
        let sorts: Vec<Value> = query
            .sorts
            .iter()
            .map(|sort| {
                let direction = match sort.direction {
                    SortDirection::Ascending => "ascending",
                    SortDirection::Descending => "descending",
                };
                json!({ "property": sort.property, "direction": direction })
            })
            .collect();
        body.insert("sorts".to_string(), Value::Array(sorts));
    }
    if let Some(cursor) = &query.start_cursor {
        body.insert("start_cursor".to_string(), Value::String(cursor.clone()));
    }
    Value::Object(body)
}

fn parse_page(page: &Value) -> CollaboratorResult<ExternalRecord> {
    let id = page
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CollaboratorError::InvalidPayload("page without id".to_string()))?;
    let name = property(page, PROP_NAME)
        .and_then(|prop| prop.get("title"))
        .and_then(Value::as_array)
        .and_then(|titles| titles.first())
        .and_then(|title| title.get("plain_text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let record_type = property(page, PROP_TYPE)
        .and_then(|prop| prop.get("select"))
        .and_then(|select| select.get("name"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    let url = property(page, PROP_URL)
        .and_then(|prop| prop.get("url"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    Ok(ExternalRecord {
        id: id.to_string(),
        name,
        record_type,
        url,
    })
}

fn property<'a>(page: &'a Value, name: &str) -> Option<&'a Value> {
    page.get("properties")?.get(name)
}
