use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::commission::RuleMap;
use crate::models::{GroupAssignment, IbPartner};

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub group_id: String,
    pub group_name: Option<String>,
    pub structure_id: Option<String>,
    pub structure_name: Option<String>,
    pub usd_per_lot: Decimal,
    pub spread_share_percentage: Decimal,
}

pub async fn for_partner(pool: &PgPool, partner_id: Uuid) -> anyhow::Result<Vec<GroupAssignment>> {
    let assignments = sqlx::query_as::<_, GroupAssignment>(
        "SELECT * FROM group_assignments WHERE ib_request_id = $1 ORDER BY created_at",
    )
    .bind(partner_id)
    .fetch_all(pool)
    .await?;

    Ok(assignments)
}

/// Replace a partner's rule set wholesale. Delete-then-insert inside one
/// transaction so a reader never observes a partial set.
pub async fn replace_for_partner(
    pool: &PgPool,
    partner_id: Uuid,
    rules: &[NewAssignment],
) -> anyhow::Result<Vec<GroupAssignment>> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM group_assignments WHERE ib_request_id = $1")
        .bind(partner_id)
        .execute(&mut *tx)
        .await?;

    let mut inserted = Vec::with_capacity(rules.len());
    for rule in rules {
        let row = sqlx::query_as::<_, GroupAssignment>(
            r#"
            INSERT INTO group_assignments (
                ib_request_id, group_id, group_name, structure_id, structure_name,
                usd_per_lot, spread_share_percentage
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(partner_id)
        .bind(&rule.group_id)
        .bind(&rule.group_name)
        .bind(&rule.structure_id)
        .bind(&rule.structure_name)
        .bind(rule.usd_per_lot)
        .bind(rule.spread_share_percentage)
        .fetch_one(&mut *tx)
        .await?;
        inserted.push(row);
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Drop all rules for a partner (rejection / ban).
pub async fn clear_for_partner(pool: &PgPool, partner_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM group_assignments WHERE ib_request_id = $1")
        .bind(partner_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// One RuleMap per partner, with the legacy wildcard fallback applied for
/// partners holding no explicit assignments. Built once per pass and
/// reused across all of a partner's accounts.
pub async fn rule_maps(
    pool: &PgPool,
    partners: &[IbPartner],
) -> anyhow::Result<HashMap<Uuid, RuleMap>> {
    let ids: Vec<Uuid> = partners.iter().map(|p| p.id).collect();
    let assignments = sqlx::query_as::<_, GroupAssignment>(
        "SELECT * FROM group_assignments WHERE ib_request_id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut by_partner: HashMap<Uuid, Vec<GroupAssignment>> = HashMap::new();
    for a in assignments {
        by_partner.entry(a.ib_request_id).or_default().push(a);
    }

    let mut maps = HashMap::with_capacity(partners.len());
    for partner in partners {
        let own = by_partner.remove(&partner.id).unwrap_or_default();
        maps.insert(partner.id, RuleMap::for_partner(partner, &own));
    }

    Ok(maps)
}
