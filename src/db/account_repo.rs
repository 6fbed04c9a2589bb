use sqlx::PgPool;
use uuid::Uuid;

use crate::models::TradingAccount;

/// Trading accounts attributed to a partner.
pub async fn for_partner(pool: &PgPool, partner_id: Uuid) -> anyhow::Result<Vec<TradingAccount>> {
    let accounts = sqlx::query_as::<_, TradingAccount>(
        "SELECT * FROM trading_accounts WHERE ib_request_id = $1 ORDER BY created_at",
    )
    .bind(partner_id)
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

/// Accounts owned by a trader email, regardless of attribution.
pub async fn owned_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Vec<TradingAccount>> {
    let accounts = sqlx::query_as::<_, TradingAccount>(
        "SELECT * FROM trading_accounts WHERE LOWER(owner_email) = LOWER($1)",
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

/// Record the broker group last resolved for an account.
pub async fn update_group(pool: &PgPool, account_id: &str, group: &str) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE trading_accounts SET group_id = $2, updated_at = NOW() WHERE account_id = $1",
    )
    .bind(account_id)
    .bind(group)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn upsert_account(
    pool: &PgPool,
    account_id: &str,
    ib_request_id: Option<Uuid>,
    owner_email: Option<&str>,
    account_type: Option<&str>,
) -> anyhow::Result<TradingAccount> {
    let account = sqlx::query_as::<_, TradingAccount>(
        r#"
        INSERT INTO trading_accounts (account_id, ib_request_id, owner_email, account_type)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (account_id) DO UPDATE SET
            ib_request_id = COALESCE(EXCLUDED.ib_request_id, trading_accounts.ib_request_id),
            owner_email = COALESCE(EXCLUDED.owner_email, trading_accounts.owner_email),
            account_type = COALESCE(EXCLUDED.account_type, trading_accounts.account_type),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(account_id)
    .bind(ib_request_id)
    .bind(owner_email)
    .bind(account_type)
    .fetch_one(pool)
    .await?;

    Ok(account)
}
