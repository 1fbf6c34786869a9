//! Dropbox webhook endpoints and the background sync they trigger.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use hmac::{Hmac, Mac};
use notionify_core::{FolderSyncOutcome, FolderSynchronizer};
use serde::Deserialize;
use sha2::Sha256;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::routes::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-dropbox-signature";

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    challenge: Option<String>,
}

/// Endpoint verification: echo the challenge back as plain text.
pub async fn verify_challenge(Query(query): Query<ChallengeQuery>) -> impl IntoResponse {
    let challenge = query.challenge.unwrap_or_default();
    tracing::info!(challenge_len = challenge.len(), "Webhook verification request");
    (
        [(CONTENT_TYPE, "text/plain"), (X_CONTENT_TYPE_OPTIONS, "nosniff")],
        challenge,
    )
}

/// Change notification: answer right away and sync the root folder in the background.
pub async fn notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    if let Some(secret) = state.config.dropbox_app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing webhook signature"))?;
        if !signature_matches(secret, &body, signature) {
            tracing::warn!(body_len = body.len(), "Rejected webhook with a bad signature");
            return Err(AppError::unauthorized("webhook signature mismatch"));
        }
    }

    tracing::info!(
        folder = %state.config.dropbox_root_folder,
        "Webhook notification received"
    );
    spawn_folder_sync(
        Arc::clone(&state.folder),
        state.config.dropbox_root_folder.clone(),
    );
    Ok(StatusCode::OK)
}

/// Run `sync_folder(path)` detached. A watcher task awaits the join handle so
/// errors and panics end up in the log instead of vanishing with the task.
pub fn spawn_folder_sync(folder: Arc<FolderSynchronizer>, path: String) -> JoinHandle<()> {
    let task = {
        let path = path.clone();
        tokio::spawn(async move { folder.sync_folder(&path).await })
    };
    tokio::spawn(async move {
        match task.await {
            Ok(Ok(outcome)) => log_outcome(&path, &outcome),
            Ok(Err(error)) => tracing::error!(path = %path, error = %error, "Folder sync failed"),
            Err(error) => {
                tracing::error!(path = %path, error = %error, "Folder sync task aborted");
            }
        }
    })
}

pub fn log_outcome(path: &str, outcome: &FolderSyncOutcome) {
    match &outcome.failure {
        None => tracing::info!(
            path,
            records = outcome.records.len(),
            cursor_advanced = outcome.cursor_advanced,
            "Folder sync finished"
        ),
        Some(failure) => tracing::warn!(
            path,
            records = outcome.records.len(),
            failed = failure.len(),
            error = %failure,
            "Folder sync finished with failures"
        ),
    }
}

/// `signature` is the lowercase hex HMAC-SHA256 of `body` keyed by the app secret.
pub fn signature_matches(secret: &str, body: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    if signature.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
