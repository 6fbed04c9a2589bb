use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::commission::{aggregator, TimeWindow};
use crate::errors::AppError;
use crate::AppState;

use super::dashboard::require_approved;

#[derive(Deserialize)]
pub struct WindowQuery {
    /// Trailing window in days; absent means all time.
    pub days: Option<i64>,
}

impl WindowQuery {
    fn window(&self) -> Result<TimeWindow, AppError> {
        match self.days {
            None => Ok(TimeWindow::unbounded()),
            Some(d) if d > 0 => Ok(TimeWindow::trailing_days(d)),
            Some(_) => Err(AppError::BadRequest("days must be positive".into())),
        }
    }
}

/// GET /api/partners/:id/commission
pub async fn analytics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let partner = require_approved(&state, id).await?;
    let window = query.window()?;

    let cache_key = format!("commission:{id}:{}", query.days.unwrap_or(0));
    if let Some(cached) = state.cache.get(&cache_key) {
        return Ok(Json(json!({ "success": true, "data": cached })));
    }

    let report = aggregator::aggregate_own(&state.db, &partner, window).await?;
    let data = serde_json::to_value(&report).map_err(anyhow::Error::from)?;

    state.cache.put(cache_key, data.clone());
    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /api/partners/:id/downline
pub async fn downline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let partner = require_approved(&state, id).await?;
    let window = query.window()?;

    let cache_key = format!("downline:{id}:{}", query.days.unwrap_or(0));
    if let Some(cached) = state.cache.get(&cache_key) {
        return Ok(Json(json!({ "success": true, "data": cached })));
    }

    let report = aggregator::aggregate_downline(&state.db, &partner, window).await?;
    let data = serde_json::to_value(&report).map_err(anyhow::Error::from)?;

    state.cache.put(cache_key, data.clone());
    Ok(Json(json!({ "success": true, "data": data })))
}
