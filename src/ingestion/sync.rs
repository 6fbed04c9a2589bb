//! Trade ingestion for one trading account.
//!
//! Flow per cycle: resolve the account's broker group, fetch the history
//! window, admit valid closed trades, normalize volume, compute the fixed
//! commission from the partner's rule map, and upsert each row by order
//! id. Every step tolerates upstream sloppiness — one bad item never
//! aborts the batch, one unreachable account never aborts the pass.

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::commission::RuleMap;
use crate::db::{account_repo, trade_repo};
use crate::models::TradingAccount;
use crate::mt5::{Mt5Client, RawTradeItem};

#[derive(Debug, Clone, Copy)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncWindow {
    pub fn trailing_days(days: i64) -> Self {
        let to = Utc::now();
        Self {
            from: to - chrono::Duration::days(days),
            to,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncStats {
    pub fetched: usize,
    pub admitted: usize,
    pub upserted: usize,
    pub dropped: usize,
    pub failed: usize,
}

/// Admission: a raw item is worth tracking only when it is a plain
/// buy/sell with a symbol and non-zero volume and prices. Everything else
/// (balance ops, swaps, zero-volume artifacts) is dropped without
/// per-item logging.
pub fn admit(item: &RawTradeItem) -> bool {
    !item.symbol.trim().is_empty()
        && item.side().is_some()
        && !item.close_price.is_zero()
        && !item.open_price.is_zero()
        && !item.volume.is_zero()
}

/// The broker sometimes reports lots in a scaled unit; anything below 0.1
/// is assumed scaled and brought back to standard lots.
pub fn normalize_volume(raw: Decimal) -> Decimal {
    if raw < Decimal::new(1, 1) {
        raw * Decimal::from(1000)
    } else {
        raw
    }
}

/// Pull the account's trade history and merge it into the ledger.
pub async fn ingest_account(
    client: &Mt5Client,
    pool: &PgPool,
    account: &TradingAccount,
    window: SyncWindow,
    rule_map: &RuleMap,
    page_size: u32,
) -> anyhow::Result<SyncStats> {
    // Group resolution failure is not fatal: the cycle proceeds with zero
    // commission and the stored group stays untouched (COALESCE upsert).
    let group = match client.get_client_profile(&account.account_id).await {
        Ok(Some(profile)) => profile.group,
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(
                account_id = %account.account_id,
                error = %e,
                "client profile fetch failed, syncing without group"
            );
            counter!("broker_errors_total").increment(1);
            None
        }
    };

    if let Some(g) = &group {
        if let Err(e) = account_repo::update_group(pool, &account.account_id, g).await {
            tracing::warn!(account_id = %account.account_id, error = %e, "failed to record account group");
        }
    }

    let usd_per_lot = group
        .as_deref()
        .and_then(|g| rule_map.resolve(g))
        .map(|terms| terms.usd_per_lot)
        .unwrap_or(Decimal::ZERO);

    let items = client
        .get_trade_history(&account.account_id, window.from, window.to, page_size)
        .await?;

    let mut stats = SyncStats {
        fetched: items.len(),
        ..Default::default()
    };

    for item in &items {
        if !admit(item) {
            stats.dropped += 1;
            continue;
        }
        let Some(side) = item.side() else {
            stats.dropped += 1;
            continue;
        };
        stats.admitted += 1;

        let volume_lots = normalize_volume(item.volume);
        let new_trade = trade_repo::NewTrade {
            order_id: item.order_id,
            account_id: account.account_id.clone(),
            ib_request_id: account.ib_request_id,
            user_email: account.owner_email.clone(),
            symbol: item.symbol.trim().to_string(),
            order_type: side.as_str().to_string(),
            volume_lots,
            open_price: item.open_price,
            close_price: item.close_price,
            profit: item.profit,
            take_profit: item.take_profit,
            stop_loss: item.stop_loss,
            group_id: group.clone(),
            ib_commission: volume_lots * usd_per_lot,
            close_time: item.close_time(),
        };

        match trade_repo::upsert_trade(pool, &new_trade).await {
            Ok(_) => stats.upserted += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::error!(
                    order_id = item.order_id,
                    account_id = %account.account_id,
                    error = %e,
                    "failed to persist trade"
                );
            }
        }
    }

    counter!("trades_upserted_total").increment(stats.upserted as u64);
    tracing::debug!(
        account_id = %account.account_id,
        fetched = stats.fetched,
        admitted = stats.admitted,
        upserted = stats.upserted,
        dropped = stats.dropped,
        "account sync cycle finished"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: serde_json::Value) -> RawTradeItem {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_admit_valid_closed_trade() {
        let t = item(json!({
            "OrderId": 1, "Symbol": "EURUSD", "OrderType": "buy",
            "Volume": 1.0, "OpenPrice": 1.1, "ClosePrice": 1.2, "Profit": 10,
        }));
        assert!(admit(&t));
    }

    #[test]
    fn test_admit_rejects_balance_ops() {
        let t = item(json!({
            "OrderId": 2, "Symbol": "EURUSD", "OrderType": "balance",
            "Volume": 1.0, "OpenPrice": 1.1, "ClosePrice": 1.2,
        }));
        assert!(!admit(&t));
    }

    #[test]
    fn test_admit_rejects_open_positions() {
        // No close price yet: not a closed trade.
        let t = item(json!({
            "OrderId": 3, "Symbol": "EURUSD", "OrderType": "sell",
            "Volume": 1.0, "OpenPrice": 1.1,
        }));
        assert!(!admit(&t));
    }

    #[test]
    fn test_admit_rejects_blank_symbol_and_zero_volume() {
        let blank = item(json!({
            "OrderId": 4, "OrderType": "buy",
            "Volume": 1.0, "OpenPrice": 1.1, "ClosePrice": 1.2,
        }));
        assert!(!admit(&blank));

        let zero_vol = item(json!({
            "OrderId": 5, "Symbol": "EURUSD", "OrderType": "buy",
            "Volume": 0, "OpenPrice": 1.1, "ClosePrice": 1.2,
        }));
        assert!(!admit(&zero_vol));
    }

    #[test]
    fn test_admit_accepts_zero_profit() {
        // Zero profit is stored (excluded later from aggregation only).
        let t = item(json!({
            "OrderId": 6, "Symbol": "EURUSD", "OrderType": "buy",
            "Volume": 1.0, "OpenPrice": 1.1, "ClosePrice": 1.2, "Profit": 0,
        }));
        assert!(admit(&t));
    }

    #[test]
    fn test_normalize_volume_scales_small_values() {
        assert_eq!(normalize_volume(Decimal::new(5, 2)), Decimal::from(50));
        assert_eq!(normalize_volume(Decimal::new(99, 3)), Decimal::new(99, 0));
        assert_eq!(normalize_volume(Decimal::new(1, 1)), Decimal::new(1, 1));
        assert_eq!(normalize_volume(Decimal::from(2)), Decimal::from(2));
        assert_eq!(normalize_volume(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_scaled_volume_commission_scenario() {
        // Raw volume 0.05 at 15 USD/lot: 50 lots, 750 fixed commission.
        let volume = normalize_volume(Decimal::new(5, 2));
        let commission = volume * Decimal::from(15);
        assert_eq!(volume, Decimal::from(50));
        assert_eq!(commission, Decimal::from(750));
    }
}
