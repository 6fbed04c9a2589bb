mod common;

use rust_decimal::Decimal;

use ibportal::db::trade_repo::{self, NewTrade};

fn new_trade(order_id: i64, profit: i64, group: Option<&str>) -> NewTrade {
    NewTrade {
        order_id,
        account_id: "100001".into(),
        ib_request_id: None,
        user_email: None,
        symbol: "EURUSD".into(),
        order_type: "buy".into(),
        volume_lots: Decimal::ONE,
        open_price: Decimal::new(11000, 4),
        close_price: Decimal::new(11050, 4),
        profit: Decimal::from(profit),
        take_profit: Decimal::ZERO,
        stop_loss: Decimal::ZERO,
        group_id: group.map(Into::into),
        ib_commission: Decimal::from(7),
        close_time: None,
    }
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let pool = common::setup_test_db().await;

    let first = new_trade(9001, 10, Some("Bbook\\Standard\\USD"));
    trade_repo::upsert_trade(&pool, &first).await.expect("insert should succeed");
    trade_repo::upsert_trade(&pool, &first).await.expect("re-ingest should succeed");

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades WHERE order_id = 9001")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 1, "re-ingestion must not duplicate the order");
}

#[tokio::test]
async fn test_resync_updates_mutable_fields() {
    let pool = common::setup_test_db().await;

    // First sync reports profit 10, the re-sync reports 12: the ledger
    // must hold 12, not 22.
    trade_repo::upsert_trade(&pool, &new_trade(9002, 10, Some("standard")))
        .await
        .unwrap();
    let updated = trade_repo::upsert_trade(&pool, &new_trade(9002, 12, Some("standard")))
        .await
        .unwrap();

    assert_eq!(updated.profit, Some(Decimal::from(12)));

    let stored = trade_repo::get_by_order_id(&pool, 9002).await.unwrap().unwrap();
    assert_eq!(stored.profit, Some(Decimal::from(12)));
}

#[tokio::test]
async fn test_resync_preserves_known_group() {
    let pool = common::setup_test_db().await;

    trade_repo::upsert_trade(&pool, &new_trade(9003, 10, Some("Bbook\\Standard\\USD")))
        .await
        .unwrap();

    // Next cycle failed to resolve the group: the stored one must survive.
    let updated = trade_repo::upsert_trade(&pool, &new_trade(9003, 11, None))
        .await
        .unwrap();

    assert_eq!(updated.group_id.as_deref(), Some("Bbook\\Standard\\USD"));
    assert_eq!(updated.profit, Some(Decimal::from(11)));
}

#[tokio::test]
async fn test_resync_overwrites_group_when_present() {
    let pool = common::setup_test_db().await;

    trade_repo::upsert_trade(&pool, &new_trade(9004, 10, Some("Bbook\\Standard\\USD")))
        .await
        .unwrap();
    let updated = trade_repo::upsert_trade(&pool, &new_trade(9004, 10, Some("Bbook\\Vip\\USD")))
        .await
        .unwrap();

    assert_eq!(updated.group_id.as_deref(), Some("Bbook\\Vip\\USD"));
}

#[tokio::test]
async fn test_zero_profit_row_is_stored() {
    let pool = common::setup_test_db().await;

    // Valid close, zero profit: stored in the ledger, filtered from
    // aggregation elsewhere.
    let stored = trade_repo::upsert_trade(&pool, &new_trade(9005, 0, Some("standard")))
        .await
        .unwrap();

    assert_eq!(stored.profit, Some(Decimal::ZERO));
    assert!(!stored.is_aggregation_eligible());
}
