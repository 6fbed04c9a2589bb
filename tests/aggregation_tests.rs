mod common;

use rust_decimal::Decimal;

use ibportal::commission::{aggregator, TimeWindow};

#[tokio::test]
async fn test_own_commission_totals_reconcile() {
    let pool = common::setup_test_db().await;

    let partner = common::seed_partner(&pool, "own@example.com", "approved", None).await;
    common::seed_account(&pool, &partner, "100001", "live").await;
    common::seed_assignment(&pool, partner.id, "standard", 7, 20).await;

    // Two matched trades, one unmatched group, one zero-profit leg.
    common::seed_trade(&pool, partner.id, "100001", 1, "Bbook\\Standard\\USD",
        Decimal::from(2), Decimal::from(14), Decimal::from(30), 1).await;
    common::seed_trade(&pool, partner.id, "100001", 2, "standard",
        Decimal::from(3), Decimal::from(21), Decimal::from(-5), 1).await;
    common::seed_trade(&pool, partner.id, "100001", 3, "Bbook\\Vip\\USD",
        Decimal::from(10), Decimal::from(70), Decimal::from(50), 1).await;
    common::seed_trade(&pool, partner.id, "100001", 4, "standard",
        Decimal::from(5), Decimal::from(35), Decimal::ZERO, 1).await;

    let report = aggregator::aggregate_own(&pool, &partner, TimeWindow::unbounded())
        .await
        .expect("aggregation should succeed");

    // Only the two matched, non-zero-profit trades count.
    assert_eq!(report.trade_count, 2);
    assert_eq!(report.fixed, Decimal::from(35));
    // spread = (2 + 3) * 20% = 1 lot-equivalent
    assert_eq!(report.spread, Decimal::ONE);
    assert_eq!(report.total, report.fixed + report.spread);
}

#[tokio::test]
async fn test_demo_accounts_excluded_from_own_totals() {
    let pool = common::setup_test_db().await;

    let partner = common::seed_partner(&pool, "demo@example.com", "approved", None).await;
    common::seed_account(&pool, &partner, "200001", "live").await;
    common::seed_account(&pool, &partner, "200002", "demo").await;
    common::seed_assignment(&pool, partner.id, "standard", 7, 0).await;

    common::seed_trade(&pool, partner.id, "200001", 11, "standard",
        Decimal::ONE, Decimal::from(7), Decimal::from(10), 1).await;
    common::seed_trade(&pool, partner.id, "200002", 12, "standard",
        Decimal::ONE, Decimal::from(7), Decimal::from(10), 1).await;

    let report = aggregator::aggregate_own(&pool, &partner, TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(report.trade_count, 1, "demo account trades must not accrue");
    assert_eq!(report.fixed, Decimal::from(7));
}

#[tokio::test]
async fn test_time_window_bounds_aggregation() {
    let pool = common::setup_test_db().await;

    let partner = common::seed_partner(&pool, "window@example.com", "approved", None).await;
    common::seed_account(&pool, &partner, "300001", "live").await;
    common::seed_assignment(&pool, partner.id, "standard", 7, 0).await;

    common::seed_trade(&pool, partner.id, "300001", 21, "standard",
        Decimal::ONE, Decimal::from(7), Decimal::from(10), 1).await;
    common::seed_trade(&pool, partner.id, "300001", 22, "standard",
        Decimal::ONE, Decimal::from(7), Decimal::from(10), 40).await;

    let report = aggregator::aggregate_own(&pool, &partner, TimeWindow::trailing_days(30))
        .await
        .unwrap();

    assert_eq!(report.trade_count, 1, "rows outside the window are excluded");
}

#[tokio::test]
async fn test_downline_excludes_partners_own_accounts() {
    let pool = common::setup_test_db().await;

    let sponsor = common::seed_partner(&pool, "sponsor@example.com", "approved", None).await;
    let member = common::seed_partner(&pool, "member@example.com", "approved", Some(sponsor.id)).await;

    // The sponsor also trades under their own referral tree.
    common::seed_account(&pool, &sponsor, "400001", "live").await;
    common::seed_account(&pool, &member, "400002", "live").await;
    common::seed_assignment(&pool, member.id, "standard", 10, 0).await;

    // A member trade and a trade on the sponsor's own account that ended
    // up attributed to the member.
    common::seed_trade(&pool, member.id, "400002", 31, "standard",
        Decimal::ONE, Decimal::from(10), Decimal::from(5), 1).await;
    common::seed_trade(&pool, member.id, "400001", 32, "standard",
        Decimal::ONE, Decimal::from(10), Decimal::from(5), 1).await;

    let report = aggregator::aggregate_downline(&pool, &sponsor, TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(report.members.len(), 1);
    assert_eq!(report.members[0].report.trade_count, 1,
        "sponsor-owned accounts never count toward the downline");
    assert_eq!(report.total, Decimal::from(10));
}

#[tokio::test]
async fn test_downline_walks_transitive_referrals() {
    let pool = common::setup_test_db().await;

    let root = common::seed_partner(&pool, "root@example.com", "approved", None).await;
    let child = common::seed_partner(&pool, "child@example.com", "approved", Some(root.id)).await;
    let grandchild =
        common::seed_partner(&pool, "grandchild@example.com", "approved", Some(child.id)).await;

    common::seed_account(&pool, &grandchild, "500001", "live").await;
    common::seed_assignment(&pool, grandchild.id, "standard", 4, 0).await;
    common::seed_trade(&pool, grandchild.id, "500001", 41, "standard",
        Decimal::from(2), Decimal::from(8), Decimal::from(3), 1).await;

    let report = aggregator::aggregate_downline(&pool, &root, TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(report.members.len(), 2);
    assert_eq!(report.total, Decimal::from(8));
}

#[tokio::test]
async fn test_wildcard_fallback_applies_legacy_rates() {
    let pool = common::setup_test_db().await;

    let partner = common::seed_partner(&pool, "legacy@example.com", "approved", None).await;
    sqlx::query("UPDATE ib_requests SET usd_per_lot = 5, spread_percentage_per_lot = 10 WHERE id = $1")
        .bind(partner.id)
        .execute(&pool)
        .await
        .unwrap();
    let partner = ibportal::db::partner_repo::get_partner(&pool, partner.id)
        .await
        .unwrap()
        .unwrap();

    common::seed_account(&pool, &partner, "600001", "live").await;
    // No explicit assignments: any group falls back to the defaults.
    common::seed_trade(&pool, partner.id, "600001", 51, "Bbook\\Whatever\\JPY",
        Decimal::from(2), Decimal::from(10), Decimal::from(4), 1).await;

    let report = aggregator::aggregate_own(&pool, &partner, TimeWindow::unbounded())
        .await
        .unwrap();

    assert_eq!(report.trade_count, 1);
    assert_eq!(report.fixed, Decimal::from(10));
    // spread = 2 lots * 10% = 0.2
    assert_eq!(report.spread, Decimal::new(2, 1));
}
