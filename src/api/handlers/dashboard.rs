use axum::extract::{Path, State};
use axum::Json;
use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::commission::{aggregator, TimeWindow};
use crate::db::{account_repo, partner_repo, rule_repo, trade_repo, withdrawal_repo};
use crate::errors::AppError;
use crate::models::{IbPartner, TradingAccount};
use crate::AppState;

/// Live balances resolved per account from the broker, zeroed when the
/// broker is unreachable so the dashboard still loads from ledger data.
#[derive(Serialize)]
struct AccountSnapshot {
    account_id: String,
    group: Option<String>,
    balance: Decimal,
    equity: Decimal,
    margin: Decimal,
    profit: Decimal,
    reachable: bool,
}

/// GET /api/partners/:id/dashboard
pub async fn overview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let partner = require_approved(&state, id).await?;

    let cache_key = format!("dashboard:{id}");
    if let Some(cached) = state.cache.get(&cache_key) {
        return Ok(Json(json!({ "success": true, "data": cached })));
    }

    let accounts = account_repo::for_partner(&state.db, partner.id).await?;
    let live: Vec<&TradingAccount> = accounts.iter().filter(|a| !a.is_demo()).collect();

    let snapshots = fetch_snapshots(&state, &live).await;
    let total_balance: Decimal = snapshots.iter().map(|s| s.balance).sum();
    let total_equity: Decimal = snapshots.iter().map(|s| s.equity).sum();

    let report = aggregator::aggregate_own(&state.db, &partner, TimeWindow::unbounded()).await?;

    let assignments = rule_repo::for_partner(&state.db, partner.id).await?;
    let totals = withdrawal_repo::totals(&state.db, partner.id).await?;
    let available = withdrawal_repo::available(report.total, &totals);

    let total_trades = trade_repo::count_for_partner(&state.db, partner.id).await?;
    let recent = trade_repo::recent_for_partner(&state.db, partner.id, 10).await?;

    let data = json!({
        "stats": {
            "total_trades": total_trades,
            "commissionable_trades": report.trade_count,
            "volume_lots": report.volume_lots,
            "total_balance": total_balance,
            "total_equity": total_equity,
        },
        "accounts": snapshots,
        "groups": assignments,
        "commission_by_type": {
            "fixed": report.fixed,
            "spread": report.spread,
            "total": report.total,
        },
        "summary": {
            "total_earned": report.total,
            "total_paid": totals.paid,
            "total_pending": totals.pending,
            "available": available,
        },
        "recent_trades": recent,
    });

    state.cache.put(cache_key, data.clone());
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn fetch_snapshots(state: &AppState, accounts: &[&TradingAccount]) -> Vec<AccountSnapshot> {
    // Index into `accounts` rather than taking the element reference as the
    // mapping closure's argument: a reference-typed closure parameter
    // captured by the returned future defeats higher-ranked lifetime
    // inference once this router handler is boxed by axum.
    stream::iter((0..accounts.len()).map(|i| async move {
        let account = accounts[i];
        match state.mt5.get_client_profile(&account.account_id).await {
            Ok(Some(profile)) => AccountSnapshot {
                account_id: account.account_id.clone(),
                group: profile.group.or_else(|| account.group_id.clone()),
                balance: profile.balance,
                equity: profile.equity,
                margin: profile.margin,
                profit: profile.profit,
                reachable: true,
            },
            Ok(None) => offline_snapshot(account),
            Err(e) => {
                tracing::warn!(
                    account_id = %account.account_id,
                    error = %e,
                    "balance fetch failed, serving zeroed snapshot"
                );
                offline_snapshot(account)
            }
        }
    }))
    .buffer_unordered(4)
    .collect()
    .await
}

fn offline_snapshot(account: &TradingAccount) -> AccountSnapshot {
    AccountSnapshot {
        account_id: account.account_id.clone(),
        group: account.group_id.clone(),
        balance: Decimal::ZERO,
        equity: Decimal::ZERO,
        margin: Decimal::ZERO,
        profit: Decimal::ZERO,
        reachable: false,
    }
}

/// Shared partner gate: 404 on unknown id, 403 unless approved.
pub async fn require_approved(state: &AppState, id: Uuid) -> Result<IbPartner, AppError> {
    let partner = partner_repo::get_partner(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("partner {id} not found")))?;

    if !partner.is_approved() {
        return Err(AppError::Forbidden("partner is not approved".into()));
    }
    Ok(partner)
}
