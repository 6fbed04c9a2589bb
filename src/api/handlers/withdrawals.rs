use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::commission::{aggregator, TimeWindow};
use crate::db::withdrawal_repo;
use crate::errors::AppError;
use crate::models::{Withdrawal, WithdrawalStatus};
use crate::AppState;

use super::dashboard::require_approved;
use super::ApiResponse;

#[derive(Deserialize)]
pub struct CreateRequest {
    pub amount: Decimal,
    pub method: String,
    pub account_details: Option<String>,
}

/// POST /api/partners/:id/withdrawals
///
/// A request is accepted up to and including the exact available balance.
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateRequest>,
) -> Result<Json<ApiResponse<Withdrawal>>, AppError> {
    let partner = require_approved(&state, id).await?;

    if body.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "withdrawal amount must be positive".into(),
        ));
    }
    if body.method.trim().is_empty() {
        return Err(AppError::BadRequest("withdrawal method is required".into()));
    }

    let report = aggregator::aggregate_own(&state.db, &partner, TimeWindow::unbounded()).await?;
    let totals = withdrawal_repo::totals(&state.db, partner.id).await?;
    let available = withdrawal_repo::available(report.total, &totals);

    if body.amount > available {
        return Err(AppError::BadRequest(format!(
            "requested amount {} exceeds available balance {}",
            body.amount, available
        )));
    }

    let withdrawal = withdrawal_repo::create(
        &state.db,
        partner.id,
        body.amount,
        body.method.trim(),
        body.account_details.as_deref(),
    )
    .await?;

    tracing::info!(
        partner = %partner.email,
        amount = %withdrawal.amount,
        method = %withdrawal.method,
        "withdrawal request recorded"
    );

    Ok(Json(ApiResponse::ok(withdrawal)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/partners/:id/withdrawals
pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Withdrawal>>>, AppError> {
    let partner = require_approved(&state, id).await?;

    let status = match &query.status {
        Some(s) => Some(
            WithdrawalStatus::from_str(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let withdrawals = withdrawal_repo::list_for_partner(
        &state.db,
        partner.id,
        status.map(|s| s.as_str()),
        query.limit.unwrap_or(50).clamp(1, 500),
    )
    .await?;

    Ok(Json(ApiResponse::ok(withdrawals)))
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

/// GET /api/partners/:id/withdrawals/summary
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let partner = require_approved(&state, id).await?;

    let window = match query.days {
        None => TimeWindow::unbounded(),
        Some(d) if d > 0 => TimeWindow::trailing_days(d),
        Some(_) => return Err(AppError::BadRequest("days must be positive".into())),
    };

    let report = aggregator::aggregate_own(&state.db, &partner, window).await?;
    let totals = withdrawal_repo::totals(&state.db, partner.id).await?;
    let available = withdrawal_repo::available(report.total, &totals);
    let recent = withdrawal_repo::list_for_partner(&state.db, partner.id, None, 10).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "summary": {
                "total_earned": report.total,
                "total_paid": totals.paid,
                "total_pending": totals.pending,
                "available": available,
            },
            "recent": recent,
        }
    })))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// POST /api/withdrawals/:id/status — admin decision on a request.
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<ApiResponse<Withdrawal>>, AppError> {
    let status = WithdrawalStatus::from_str(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", body.status)))?;

    let withdrawal = withdrawal_repo::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {id} not found")))?;

    Ok(Json(ApiResponse::ok(withdrawal)))
}
