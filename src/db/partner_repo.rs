use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{IbPartner, PartnerStatus};

pub async fn get_partner(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<IbPartner>> {
    let partner = sqlx::query_as::<_, IbPartner>("SELECT * FROM ib_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(partner)
}

pub async fn get_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Option<IbPartner>> {
    let partner = sqlx::query_as::<_, IbPartner>(
        "SELECT * FROM ib_requests WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(partner)
}

pub async fn get_by_referral_code(
    pool: &PgPool,
    code: &str,
) -> anyhow::Result<Option<IbPartner>> {
    let partner =
        sqlx::query_as::<_, IbPartner>("SELECT * FROM ib_requests WHERE referral_code = $1")
            .bind(code)
            .fetch_optional(pool)
            .await?;

    Ok(partner)
}

/// All partners, optionally filtered by status, most recent first.
pub async fn list_partners(
    pool: &PgPool,
    status: Option<&str>,
) -> anyhow::Result<Vec<IbPartner>> {
    let partners = sqlx::query_as::<_, IbPartner>(
        r#"
        SELECT * FROM ib_requests
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(partners)
}

/// Partners eligible for auto-sync and commission attribution.
pub async fn get_approved_partners(pool: &PgPool) -> anyhow::Result<Vec<IbPartner>> {
    let partners = sqlx::query_as::<_, IbPartner>(
        "SELECT * FROM ib_requests WHERE status = 'approved' ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(partners)
}

pub async fn create_partner(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    ib_type: Option<&str>,
    referral_code: &str,
    referred_by: Option<Uuid>,
) -> anyhow::Result<IbPartner> {
    let partner = sqlx::query_as::<_, IbPartner>(
        r#"
        INSERT INTO ib_requests (email, password_hash, ib_type, referral_code, referred_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(ib_type)
    .bind(referral_code)
    .bind(referred_by)
    .fetch_one(pool)
    .await?;

    Ok(partner)
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: PartnerStatus,
) -> anyhow::Result<Option<IbPartner>> {
    let partner = sqlx::query_as::<_, IbPartner>(
        "UPDATE ib_requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(partner)
}

/// Re-application from rejected: back to pending with a fresh password.
pub async fn reapply(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> anyhow::Result<Option<IbPartner>> {
    let partner = sqlx::query_as::<_, IbPartner>(
        r#"
        UPDATE ib_requests
        SET status = 'pending', password_hash = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'rejected'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    Ok(partner)
}

/// Update the legacy default commission rates.
pub async fn set_default_rates(
    pool: &PgPool,
    id: Uuid,
    usd_per_lot: rust_decimal::Decimal,
    spread_percentage_per_lot: rust_decimal::Decimal,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE ib_requests
        SET usd_per_lot = $2, spread_percentage_per_lot = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(usd_per_lot)
    .bind(spread_percentage_per_lot)
    .execute(pool)
    .await?;

    Ok(())
}

/// The full referral subtree below a partner (direct and transitive),
/// excluding the partner itself.
pub async fn downline(pool: &PgPool, id: Uuid) -> anyhow::Result<Vec<IbPartner>> {
    let partners = sqlx::query_as::<_, IbPartner>(
        r#"
        WITH RECURSIVE downline AS (
            SELECT * FROM ib_requests WHERE referred_by = $1
            UNION ALL
            SELECT r.* FROM ib_requests r
            JOIN downline d ON r.referred_by = d.id
        )
        SELECT * FROM downline ORDER BY created_at
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(partners)
}
