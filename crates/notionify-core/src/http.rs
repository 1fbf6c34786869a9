//! Shared helpers for the HTTP collaborators.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::CollaboratorError;

/// Build a client whose every call is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, CollaboratorError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(CollaboratorError::from)
}

/// Turn a non-success response into an `Api` error, keeping a short body excerpt.
pub async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError::Api {
        status: status.as_u16(),
        message: parse_api_error(status, &body),
    })
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_summary: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error_summary) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_body(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        trimmed
    }
}

pub fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

pub fn compact_body(body: &str) -> String {
    body.trim().chars().take(180).collect()
}
