mod common;

use rust_decimal::Decimal;

use ibportal::db::withdrawal_repo;
use ibportal::models::WithdrawalStatus;

#[tokio::test]
async fn test_totals_by_status() {
    let pool = common::setup_test_db().await;
    let partner = common::seed_partner(&pool, "wd@example.com", "approved", None).await;

    common::seed_withdrawal(&pool, partner.id, 300, "approved").await;
    common::seed_withdrawal(&pool, partner.id, 200, "pending").await;
    common::seed_withdrawal(&pool, partner.id, 150, "rejected").await;

    let totals = withdrawal_repo::totals(&pool, partner.id).await.unwrap();
    assert_eq!(totals.paid, Decimal::from(300));
    assert_eq!(totals.pending, Decimal::from(200));

    // earned 1000, paid 300, pending 200 -> available 500
    let available = withdrawal_repo::available(Decimal::from(1000), &totals);
    assert_eq!(available, Decimal::from(500));
}

#[tokio::test]
async fn test_list_is_most_recent_first_and_filterable() {
    let pool = common::setup_test_db().await;
    let partner = common::seed_partner(&pool, "wd-list@example.com", "approved", None).await;

    common::seed_withdrawal(&pool, partner.id, 100, "pending").await;
    common::seed_withdrawal(&pool, partner.id, 200, "approved").await;
    common::seed_withdrawal(&pool, partner.id, 300, "pending").await;

    let all = withdrawal_repo::list_for_partner(&pool, partner.id, None, 50)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let pending = withdrawal_repo::list_for_partner(&pool, partner.id, Some("pending"), 50)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|w| w.status == "pending"));
}

#[tokio::test]
async fn test_status_transition() {
    let pool = common::setup_test_db().await;
    let partner = common::seed_partner(&pool, "wd-status@example.com", "approved", None).await;

    let withdrawal = common::seed_withdrawal(&pool, partner.id, 100, "pending").await;
    let updated = withdrawal_repo::set_status(&pool, withdrawal.id, WithdrawalStatus::Approved)
        .await
        .unwrap()
        .expect("withdrawal should exist");

    assert_eq!(updated.status, "approved");

    let totals = withdrawal_repo::totals(&pool, partner.id).await.unwrap();
    assert_eq!(totals.paid, Decimal::from(100));
    assert_eq!(totals.pending, Decimal::ZERO);
}
