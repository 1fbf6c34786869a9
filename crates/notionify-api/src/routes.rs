use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use notionify_core::database::NotionClient;
use notionify_core::diff::FolderDiffSource;
use notionify_core::reverse::{ContentFetcher, HttpContentFetcher};
use notionify_core::storage::DropboxClient;
use notionify_core::store::LibSqlMappingStore;
use notionify_core::{
    CloudStorage, DatabaseSyncer, FolderSynchronizer, MappingStore, RecordDatabase,
    RecordSyncEngine,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::webhook::{notify, verify_challenge};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub folder: Arc<FolderSynchronizer>,
    pub reverse: Option<Arc<DatabaseSyncer>>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        storage: Arc<dyn CloudStorage>,
        database: Arc<dyn RecordDatabase>,
        store: Arc<dyn MappingStore>,
        fetcher: Option<Arc<dyn ContentFetcher>>,
    ) -> Self {
        let engine = Arc::new(RecordSyncEngine::new(
            Arc::clone(&database),
            Arc::clone(&store),
        ));
        let reverse = config
            .reverse_sync_folder
            .clone()
            .zip(fetcher)
            .map(|(folder, fetcher)| {
                Arc::new(DatabaseSyncer::new(
                    folder,
                    Arc::clone(&database),
                    Arc::clone(&storage),
                    Arc::clone(&store),
                    fetcher,
                    engine.guard().clone(),
                ))
            });
        let diff = FolderDiffSource::new(storage, store);
        Self {
            config,
            folder: Arc::new(FolderSynchronizer::new(diff, engine)),
            reverse,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub async fn from_config(config: Arc<AppConfig>) -> Result<Self, AppError> {
        let store = LibSqlMappingStore::open(&config.mapping_db_path).await?;
        let storage = DropboxClient::new(config.dropbox())?;
        let database = NotionClient::new(config.notion())?;
        let fetcher: Option<Arc<dyn ContentFetcher>> = if config.reverse_sync_folder.is_some() {
            Some(Arc::new(HttpContentFetcher::new(config.http_timeout)?))
        } else {
            None
        };
        tracing::info!(path = %config.mapping_db_path, "Mapping store opened");

        Ok(Self::new(
            config,
            Arc::new(storage),
            Arc::new(database),
            Arc::new(store),
            fetcher,
        ))
    }

    pub fn in_flight(&self) -> usize {
        self.folder.engine().guard().len()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/dropbox-webhook", get(verify_challenge).post(notify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    in_flight: usize,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        in_flight: state.in_flight(),
    })
}
