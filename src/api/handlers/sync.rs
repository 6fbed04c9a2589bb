use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::scheduler::{self, SchedulerConfig};
use crate::AppState;

/// POST /api/sync/trigger — run one sync pass now, unless one is already
/// in flight.
pub async fn trigger(State(state): State<AppState>) -> impl IntoResponse {
    if !state.sync.try_begin() {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": "sync already running" })),
        );
    }

    let config = SchedulerConfig {
        interval_secs: state.config.sync_interval_secs,
        lookback_days: state.config.sync_lookback_days,
        page_size: state.config.sync_page_size,
        concurrency: state.config.sync_concurrency,
    };
    let client = state.mt5.clone();
    let pool = state.db.clone();
    let controller = state.sync.clone();

    tokio::spawn(async move {
        let summary = match scheduler::run_sync_pass(&client, &pool, config).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "manually triggered sync pass failed");
                scheduler::PassSummary {
                    finished_at: Some(chrono::Utc::now()),
                    errors: 1,
                    ..Default::default()
                }
            }
        };
        controller.finish(summary);
    });

    tracing::info!("sync pass triggered via control API");
    (
        StatusCode::ACCEPTED,
        Json(json!({ "success": true, "data": { "status": "started" } })),
    )
}

/// GET /api/sync/status
pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "running": state.sync.is_running(),
            "enabled": state.config.sync_enabled,
            "interval_secs": state.config.sync_interval_secs,
            "last_pass": state.sync.last_pass(),
        }
    }))
}
