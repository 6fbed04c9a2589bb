use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Withdrawal, WithdrawalStatus};

/// Paid/pending sums for one partner, used for available-balance netting.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawalTotals {
    pub paid: Decimal,
    pub pending: Decimal,
}

/// Net earned commission against recorded payouts. Never negative.
pub fn available(earned: Decimal, totals: &WithdrawalTotals) -> Decimal {
    (earned - totals.paid - totals.pending).max(Decimal::ZERO)
}

pub async fn create(
    pool: &PgPool,
    partner_id: Uuid,
    amount: Decimal,
    method: &str,
    account_details: Option<&str>,
) -> anyhow::Result<Withdrawal> {
    let withdrawal = sqlx::query_as::<_, Withdrawal>(
        r#"
        INSERT INTO withdrawals (ib_request_id, amount, method, account_details)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(partner_id)
    .bind(amount)
    .bind(method)
    .bind(account_details)
    .fetch_one(pool)
    .await?;

    Ok(withdrawal)
}

pub async fn list_for_partner(
    pool: &PgPool,
    partner_id: Uuid,
    status: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Withdrawal>> {
    let withdrawals = sqlx::query_as::<_, Withdrawal>(
        r#"
        SELECT * FROM withdrawals
        WHERE ib_request_id = $1
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(partner_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(withdrawals)
}

pub async fn totals(pool: &PgPool, partner_id: Uuid) -> anyhow::Result<WithdrawalTotals> {
    let row: (Option<Decimal>, Option<Decimal>) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(amount) FILTER (WHERE status = 'approved'), 0),
            COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0)
        FROM withdrawals
        WHERE ib_request_id = $1
        "#,
    )
    .bind(partner_id)
    .fetch_one(pool)
    .await?;

    Ok(WithdrawalTotals {
        paid: row.0.unwrap_or(Decimal::ZERO),
        pending: row.1.unwrap_or(Decimal::ZERO),
    })
}

/// Admin decision on a pending request. The payout itself is recorded,
/// never executed here.
pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: WithdrawalStatus,
) -> anyhow::Result<Option<Withdrawal>> {
    let withdrawal = sqlx::query_as::<_, Withdrawal>(
        "UPDATE withdrawals SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(withdrawal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_netting() {
        let totals = WithdrawalTotals {
            paid: Decimal::from(300),
            pending: Decimal::from(200),
        };
        assert_eq!(
            available(Decimal::from(1000), &totals),
            Decimal::from(500)
        );
    }

    #[test]
    fn test_available_clamped_at_zero() {
        let totals = WithdrawalTotals {
            paid: Decimal::from(900),
            pending: Decimal::from(200),
        };
        assert_eq!(available(Decimal::from(1000), &totals), Decimal::ZERO);
    }
}
