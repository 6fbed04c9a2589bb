use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::commission::TimeWindow;
use crate::models::Trade;

/// Everything the ingestion engine knows about one admitted trade.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub order_id: i64,
    pub account_id: String,
    pub ib_request_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub symbol: String,
    pub order_type: String,
    pub volume_lots: Decimal,
    pub open_price: Decimal,
    pub close_price: Decimal,
    pub profit: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    pub group_id: Option<String>,
    pub ib_commission: Decimal,
    pub close_time: Option<DateTime<Utc>>,
}

/// Idempotent upsert keyed on the broker order id. Re-ingestion refreshes
/// the mutable fields; the stored group is only replaced when the new
/// value is non-null, so a cycle that failed to resolve the group does not
/// erase a previously known one.
pub async fn upsert_trade(pool: &PgPool, t: &NewTrade) -> anyhow::Result<Trade> {
    let trade = sqlx::query_as::<_, Trade>(
        r#"
        INSERT INTO trades (
            order_id, account_id, ib_request_id, user_email, symbol, order_type,
            volume_lots, open_price, close_price, profit, take_profit, stop_loss,
            group_id, ib_commission, close_time
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (order_id) DO UPDATE SET
            volume_lots = EXCLUDED.volume_lots,
            open_price = EXCLUDED.open_price,
            close_price = EXCLUDED.close_price,
            profit = EXCLUDED.profit,
            take_profit = EXCLUDED.take_profit,
            stop_loss = EXCLUDED.stop_loss,
            ib_commission = EXCLUDED.ib_commission,
            group_id = COALESCE(EXCLUDED.group_id, trades.group_id),
            close_time = COALESCE(EXCLUDED.close_time, trades.close_time),
            updated_at = NOW(),
            synced_at = NOW()
        RETURNING *
        "#,
    )
    .bind(t.order_id)
    .bind(&t.account_id)
    .bind(t.ib_request_id)
    .bind(&t.user_email)
    .bind(&t.symbol)
    .bind(&t.order_type)
    .bind(t.volume_lots)
    .bind(t.open_price)
    .bind(t.close_price)
    .bind(t.profit)
    .bind(t.take_profit)
    .bind(t.stop_loss)
    .bind(&t.group_id)
    .bind(t.ib_commission)
    .bind(t.close_time)
    .fetch_one(pool)
    .await?;

    Ok(trade)
}

/// Fetch a trade by broker order id.
pub async fn get_by_order_id(pool: &PgPool, order_id: i64) -> anyhow::Result<Option<Trade>> {
    let trade = sqlx::query_as::<_, Trade>("SELECT * FROM trades WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?;

    Ok(trade)
}

/// Aggregation-eligible rows for a set of partners: closed, non-zero
/// profit, plain buy/sell, optionally restricted to an account set and a
/// `synced_at` window.
pub async fn eligible_for_partners(
    pool: &PgPool,
    partner_ids: &[Uuid],
    account_ids: Option<&[String]>,
    window: TimeWindow,
) -> anyhow::Result<Vec<Trade>> {
    let trades = sqlx::query_as::<_, Trade>(
        r#"
        SELECT * FROM trades
        WHERE ib_request_id = ANY($1)
          AND close_price IS NOT NULL AND close_price <> 0
          AND profit IS NOT NULL AND profit <> 0
          AND order_type IN ('buy', 'sell')
          AND ($2::text[] IS NULL OR account_id = ANY($2))
          AND ($3::timestamptz IS NULL OR synced_at >= $3)
          AND ($4::timestamptz IS NULL OR synced_at <= $4)
        ORDER BY synced_at DESC
        "#,
    )
    .bind(partner_ids.to_vec())
    .bind(account_ids.map(|ids| ids.to_vec()))
    .bind(window.from)
    .bind(window.to)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

/// The N most recent ledger rows for a partner, eligible or not.
pub async fn recent_for_partner(
    pool: &PgPool,
    partner_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<Trade>> {
    let trades = sqlx::query_as::<_, Trade>(
        "SELECT * FROM trades WHERE ib_request_id = $1 ORDER BY synced_at DESC LIMIT $2",
    )
    .bind(partner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

/// Count all ledger rows for a partner.
pub async fn count_for_partner(pool: &PgPool, partner_id: Uuid) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades WHERE ib_request_id = $1")
        .bind(partner_id)
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
