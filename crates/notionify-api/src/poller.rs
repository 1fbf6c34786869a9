//! Interval trigger for deployments that cannot receive webhooks.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::routes::AppState;
use crate::webhook::log_outcome;

/// Run [`run_once`] every `period`. Failures are logged and retried on the next tick.
pub fn spawn_poller(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = period.as_secs(), "Polling trigger started");
        loop {
            ticker.tick().await;
            run_once(&state).await;
        }
    })
}

pub async fn run_once(state: &AppState) {
    let root = state.config.dropbox_root_folder.as_str();
    match state.folder.sync_folder(root).await {
        Ok(outcome) => log_outcome(root, &outcome),
        Err(error) => tracing::error!(path = root, error = %error, "Scheduled folder sync failed"),
    }

    if let Some(reverse) = &state.reverse {
        match reverse.sync_database().await {
            Ok(uploaded) => tracing::info!(uploaded = uploaded.len(), "Database sync finished"),
            Err(error) => tracing::error!(error = %error, "Scheduled database sync failed"),
        }
    }
}
