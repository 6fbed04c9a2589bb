//! Commission aggregation.
//!
//! One parametrized engine computes every commission figure the portal
//! serves: own-account totals, downline totals, and the per-group,
//! per-symbol and per-day breakdowns. The historical system grew six
//! near-duplicate implementations of this join; they all collapse into
//! [`accumulate`] plus a scope.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{account_repo, partner_repo, rule_repo, trade_repo};
use crate::models::{IbPartner, Trade};

use super::group_key::{is_demo_group, RuleMap};

/// Bounds on `synced_at`, both optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn trailing_days(days: i64) -> Self {
        Self {
            from: Some(Utc::now() - Duration::days(days)),
            to: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommissionReport {
    pub fixed: Decimal,
    pub spread: Decimal,
    pub total: Decimal,
    pub trade_count: i64,
    pub volume_lots: Decimal,
    pub by_group: Vec<BucketTotals>,
    pub by_symbol: Vec<BucketTotals>,
    pub by_day: Vec<BucketTotals>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketTotals {
    pub key: String,
    pub fixed: Decimal,
    pub spread: Decimal,
    pub total: Decimal,
    pub trade_count: i64,
    pub volume_lots: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DownlineReport {
    pub fixed: Decimal,
    pub spread: Decimal,
    pub total: Decimal,
    pub members: Vec<DownlineMember>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownlineMember {
    pub ib_request_id: Uuid,
    pub email: String,
    pub status: String,
    pub report: CommissionReport,
}

/// Fold eligible, rule-matched rows into a report.
///
/// Per row: the attributed partner's [`RuleMap`] resolves the trade's
/// group; on a match, `fixed` accrues the stored per-lot commission and
/// `spread` accrues `volume_lots * pct / 100`. Rows whose group matches
/// no rule are excluded entirely — they do not appear in counts either,
/// so partners are never shown totals that include unapproved activity.
/// Demo groups never contribute.
pub fn accumulate<'a, I>(rows: I, rules: &HashMap<Uuid, RuleMap>) -> CommissionReport
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut report = CommissionReport::default();
    let mut by_group: HashMap<String, BucketTotals> = HashMap::new();
    let mut by_symbol: HashMap<String, BucketTotals> = HashMap::new();
    let mut by_day: HashMap<String, BucketTotals> = HashMap::new();

    for row in rows {
        if !row.is_aggregation_eligible() {
            continue;
        }
        let group = row.group_id.as_deref().unwrap_or("");
        if is_demo_group(group) {
            continue;
        }
        let Some(partner_id) = row.ib_request_id else {
            continue;
        };
        let Some(map) = rules.get(&partner_id) else {
            continue;
        };
        let Some(terms) = map.resolve(group) else {
            continue;
        };

        let fixed = row.ib_commission;
        let spread = row.volume_lots * terms.spread_share_percentage / Decimal::ONE_HUNDRED;

        report.fixed += fixed;
        report.spread += spread;
        report.trade_count += 1;
        report.volume_lots += row.volume_lots;

        let day = row
            .close_time
            .unwrap_or(row.synced_at)
            .date_naive()
            .to_string();

        for (buckets, key) in [
            (&mut by_group, terms.group_label.clone()),
            (&mut by_symbol, row.symbol.clone()),
            (&mut by_day, day),
        ] {
            let bucket = buckets.entry(key.clone()).or_insert_with(|| BucketTotals {
                key,
                ..Default::default()
            });
            bucket.fixed += fixed;
            bucket.spread += spread;
            bucket.trade_count += 1;
            bucket.volume_lots += row.volume_lots;
        }
    }

    report.total = report.fixed + report.spread;
    report.by_group = finalize(by_group);
    report.by_symbol = finalize(by_symbol);
    report.by_day = finalize(by_day);
    report
}

fn finalize(buckets: HashMap<String, BucketTotals>) -> Vec<BucketTotals> {
    let mut out: Vec<BucketTotals> = buckets
        .into_values()
        .map(|mut b| {
            b.total = b.fixed + b.spread;
            b
        })
        .collect();
    // ISO dates sort correctly lexicographically, so one sort fits all.
    out.sort_by(|a, b| a.key.cmp(&b.key));
    out
}

/// Commission over the partner's own live (non-demo) trading accounts.
pub async fn aggregate_own(
    pool: &PgPool,
    partner: &IbPartner,
    window: TimeWindow,
) -> anyhow::Result<CommissionReport> {
    let accounts = account_repo::for_partner(pool, partner.id).await?;
    let live_ids: Vec<String> = accounts
        .iter()
        .filter(|a| !a.is_demo())
        .map(|a| a.account_id.clone())
        .collect();

    let rows =
        trade_repo::eligible_for_partners(pool, &[partner.id], Some(live_ids.as_slice()), window)
            .await?;

    let assignments = rule_repo::for_partner(pool, partner.id).await?;
    let mut rules = HashMap::new();
    rules.insert(partner.id, RuleMap::for_partner(partner, &assignments));

    Ok(accumulate(rows.iter(), &rules))
}

/// Commission generated by the partner's referred sub-partners.
///
/// The requesting partner's own accounts are excluded even when the
/// partner is also a registered trader under their own referral code —
/// "my own trading" and "my downline" are distinct dashboard figures and
/// must never overlap. Each member's rows resolve against that member's
/// own rules.
pub async fn aggregate_downline(
    pool: &PgPool,
    partner: &IbPartner,
    window: TimeWindow,
) -> anyhow::Result<DownlineReport> {
    let members = partner_repo::downline(pool, partner.id).await?;
    if members.is_empty() {
        return Ok(DownlineReport::default());
    }

    let own_accounts: HashSet<String> = account_repo::owned_by_email(pool, &partner.email)
        .await?
        .into_iter()
        .map(|a| a.account_id)
        .collect();

    let member_ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();
    let rows = trade_repo::eligible_for_partners(pool, &member_ids, None, window).await?;
    let rows: Vec<Trade> = rows
        .into_iter()
        .filter(|t| !own_accounts.contains(&t.account_id))
        .collect();

    let rules = rule_repo::rule_maps(pool, &members).await?;

    let mut out = DownlineReport::default();
    for member in &members {
        let report = accumulate(
            rows.iter().filter(|t| t.ib_request_id == Some(member.id)),
            &rules,
        );
        out.fixed += report.fixed;
        out.spread += report.spread;
        out.members.push(DownlineMember {
            ib_request_id: member.id,
            email: member.email.clone(),
            status: member.status.clone(),
            report,
        });
    }
    out.total = out.fixed + out.spread;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rules_for(partner_id: Uuid, usd: i64, pct: i64) -> HashMap<Uuid, RuleMap> {
        let partner = IbPartner {
            id: partner_id,
            email: "ib@example.com".into(),
            password_hash: "x".into(),
            status: "approved".into(),
            ib_type: None,
            usd_per_lot: Decimal::ZERO,
            spread_percentage_per_lot: Decimal::ZERO,
            referral_code: None,
            referred_by: None,
            created_at: None,
            updated_at: None,
        };
        let assignment = crate::models::GroupAssignment {
            id: Uuid::new_v4(),
            ib_request_id: partner_id,
            group_id: "standard".into(),
            group_name: Some("Standard".into()),
            structure_id: None,
            structure_name: None,
            usd_per_lot: Decimal::from(usd),
            spread_share_percentage: Decimal::from(pct),
            created_at: None,
        };
        let mut rules = HashMap::new();
        rules.insert(partner_id, RuleMap::for_partner(&partner, &[assignment]));
        rules
    }

    fn trade(
        partner_id: Uuid,
        order_id: i64,
        group: &str,
        volume: Decimal,
        commission: Decimal,
        profit: Decimal,
    ) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            order_id,
            account_id: "100001".into(),
            ib_request_id: Some(partner_id),
            user_email: None,
            symbol: "EURUSD".into(),
            order_type: "buy".into(),
            volume_lots: volume,
            open_price: Decimal::ONE,
            close_price: Some(Decimal::new(10950, 4)),
            profit: Some(profit),
            take_profit: None,
            stop_loss: None,
            group_id: Some(group.into()),
            ib_commission: commission,
            close_time: None,
            created_at: None,
            updated_at: None,
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn test_total_is_fixed_plus_spread() {
        let id = Uuid::new_v4();
        let rules = rules_for(id, 7, 20);
        let rows = vec![
            trade(id, 1, "Bbook\\Standard\\USD", Decimal::from(2), Decimal::from(14), Decimal::from(30)),
            trade(id, 2, "standard", Decimal::from(3), Decimal::from(21), Decimal::from(-10)),
        ];
        let report = accumulate(rows.iter(), &rules);

        assert_eq!(report.fixed, Decimal::from(35));
        // spread = (2 + 3) * 20 / 100 = 1
        assert_eq!(report.spread, Decimal::ONE);
        assert_eq!(report.total, report.fixed + report.spread);
        assert_eq!(report.trade_count, 2);
    }

    #[test]
    fn test_unmatched_group_fully_excluded() {
        let id = Uuid::new_v4();
        let rules = rules_for(id, 7, 20);
        let rows = vec![
            trade(id, 1, "standard", Decimal::ONE, Decimal::from(7), Decimal::from(5)),
            trade(id, 2, "Bbook\\Vip\\USD", Decimal::from(10), Decimal::from(70), Decimal::from(5)),
        ];
        let report = accumulate(rows.iter(), &rules);

        // The vip trade is excluded from totals AND counts.
        assert_eq!(report.trade_count, 1);
        assert_eq!(report.fixed, Decimal::from(7));
        assert_eq!(report.volume_lots, Decimal::ONE);
    }

    #[test]
    fn test_zero_profit_row_excluded() {
        let id = Uuid::new_v4();
        let rules = rules_for(id, 7, 20);
        let rows = vec![trade(id, 1, "standard", Decimal::ONE, Decimal::from(7), Decimal::ZERO)];
        let report = accumulate(rows.iter(), &rules);
        assert_eq!(report.trade_count, 0);
        assert_eq!(report.total, Decimal::ZERO);
    }

    #[test]
    fn test_demo_group_excluded() {
        let id = Uuid::new_v4();
        let rules = rules_for(id, 7, 20);
        // "Demo\Standard" would match the "standard" rule via its last
        // segment; the demo predicate must win.
        let rows = vec![trade(id, 1, "Demo\\Standard", Decimal::ONE, Decimal::from(7), Decimal::from(5))];
        let report = accumulate(rows.iter(), &rules);
        assert_eq!(report.trade_count, 0);
        assert_eq!(report.total, Decimal::ZERO);
    }

    #[test]
    fn test_unattributed_rows_excluded() {
        let id = Uuid::new_v4();
        let rules = rules_for(id, 7, 20);
        let mut t = trade(id, 1, "standard", Decimal::ONE, Decimal::from(7), Decimal::from(5));
        t.ib_request_id = None;
        let report = accumulate([&t], &rules);
        assert_eq!(report.trade_count, 0);
    }

    #[test]
    fn test_breakdowns_share_the_filter() {
        let id = Uuid::new_v4();
        let rules = rules_for(id, 7, 20);
        let mut a = trade(id, 1, "standard", Decimal::ONE, Decimal::from(7), Decimal::from(5));
        a.symbol = "EURUSD".into();
        let mut b = trade(id, 2, "standard", Decimal::from(2), Decimal::from(14), Decimal::from(5));
        b.symbol = "XAUUSD".into();
        let c = trade(id, 3, "vip", Decimal::from(9), Decimal::from(63), Decimal::from(5));

        let rows = vec![a, b, c];
        let report = accumulate(rows.iter(), &rules);

        assert_eq!(report.by_symbol.len(), 2);
        let sym_total: Decimal = report.by_symbol.iter().map(|b| b.total).sum();
        assert_eq!(sym_total, report.total);
        let grp_total: Decimal = report.by_group.iter().map(|b| b.total).sum();
        assert_eq!(grp_total, report.total);
    }
}
