//! Replenishment tests
//!
//! Reorder alerts, reorder recommendations and ABC classification.

mod common;

use chrono::Utc;
use common::*;
use inventory_ledger_backend::error::AppError;
use inventory_ledger_backend::store::LedgerStore;
use rust_decimal::Decimal;
use shared::{AbcClass, ReplenishmentPriority};
use uuid::Uuid;

// ============================================================================
// Reorder Alerts
// ============================================================================

#[tokio::test]
async fn test_reorder_alert_is_raised_once_per_day() {
    let fx = Fixture::new();
    let (p, l) = (fx.product(), fx.location());

    // Receiving 8 against a reorder point of 10 already alerts after commit
    fx.receive(p, l, 8, 1, "A").await;

    let today = Utc::now().date_naive();
    let alerts = fx.store.reorder_alerts(today).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].current_quantity, 8);
    assert_eq!(alerts[0].reorder_point, 10);
    assert_eq!(alerts[0].status, "pending");

    let created = fx.engine.check_reorder_points(&[p]).await.unwrap();
    assert!(created.is_empty());
    fx.engine.check_reorder_points(&[p]).await.unwrap();

    assert_eq!(fx.store.reorder_alerts(today).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_issue_below_reorder_point_raises_alert() {
    let fx = Fixture::new();
    let (p, l) = (fx.product(), fx.location());
    fx.receive(p, l, 30, 1, "A").await;

    let today = Utc::now().date_naive();
    assert!(fx.store.reorder_alerts(today).await.unwrap().is_empty());

    fx.engine.issue_inventory(issue(&[(p, l, 25)]), fx.actor).await.unwrap();

    let alerts = fx.store.reorder_alerts(today).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].product_id, p);
    assert_eq!(alerts[0].location_id, l);
    assert_eq!(alerts[0].current_quantity, 5);
}

#[tokio::test]
async fn test_reorder_check_covers_every_location_of_a_product() {
    let fx = Fixture::new();
    let (p, x, y) = (fx.product(), fx.location(), fx.location());
    fx.receive(p, x, 3, 1, "A").await;
    fx.receive(p, y, 4, 1, "B").await;

    let today = Utc::now().date_naive();
    let alerts = fx.store.reorder_alerts(today).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(fx.engine.check_reorder_points(&[]).await.unwrap().is_empty());
}

// ============================================================================
// Recommendations
// ============================================================================

#[tokio::test]
async fn test_recommendations_are_ordered_by_urgency() {
    let fx = Fixture::new();
    let l = fx.location();

    let below_min = fx.product_with(10, 50, 5, 7);
    fx.receive(below_min, l, 40, 1, "A").await;
    fx.engine
        .issue_inventory(issue(&[(below_min, l, 36)]), fx.actor)
        .await
        .unwrap();

    let at_reorder = fx.product_with(10, 5, 2, 30);
    fx.receive(at_reorder, l, 100, 1, "B").await;
    fx.engine
        .issue_inventory(issue(&[(at_reorder, l, 90)]), fx.actor)
        .await
        .unwrap();

    let empty = fx.product_with(10, 20, 5, 7);
    fx.receive(empty, l, 5, 1, "C").await;
    fx.engine
        .issue_inventory(issue(&[(empty, l, 5)]), fx.actor)
        .await
        .unwrap();

    let healthy = fx.product();
    fx.receive(healthy, l, 100, 1, "D").await;

    let report = fx.engine.generate_reorder_recommendations(l).await.unwrap();
    assert_eq!(report.total_items, 3);

    let order: Vec<(Uuid, ReplenishmentPriority)> = report
        .recommendations
        .iter()
        .map(|r| (r.product_id, r.priority))
        .collect();
    assert_eq!(
        order,
        vec![
            (empty, ReplenishmentPriority::OutOfStock),
            (below_min, ReplenishmentPriority::BelowMinimum),
            (at_reorder, ReplenishmentPriority::Reorder),
        ]
    );

    let below = &report.recommendations[1];
    assert_eq!(below.quantity_available, 4);
    assert_eq!(below.avg_daily_consumption, Decimal::new(12, 1));
    assert_eq!(below.suggested_order_quantity, 50);

    // 90 units over 30 days, 30 day lead time, 1.2 safety factor
    let reorder = &report.recommendations[2];
    assert_eq!(reorder.avg_daily_consumption, dec(3));
    assert_eq!(reorder.suggested_order_quantity, 108);
}

#[tokio::test]
async fn test_recommendations_for_unknown_location() {
    let fx = Fixture::new();
    let err = fx
        .engine
        .generate_reorder_recommendations(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// ABC Analysis
// ============================================================================

#[tokio::test]
async fn test_abc_classifies_by_issued_value() {
    let fx = Fixture::new();
    let l = fx.location();
    let (high, mid, low) = (fx.product(), fx.product(), fx.product());

    fx.receive(high, l, 100, 8, "H").await;
    fx.receive(mid, l, 15, 10, "M").await;
    fx.receive(low, l, 5, 10, "L").await;
    fx.engine
        .issue_inventory(issue(&[(high, l, 100), (mid, l, 15), (low, l, 5)]), fx.actor)
        .await
        .unwrap();

    let analysis = fx
        .engine
        .perform_abc_analysis(l, Utc::now().date_naive())
        .await
        .unwrap();

    let classes: Vec<(Uuid, AbcClass, Decimal)> = analysis
        .products
        .iter()
        .map(|p| (p.product_id, p.classification, p.total_value))
        .collect();
    assert_eq!(
        classes,
        vec![
            (high, AbcClass::A, dec(800)),
            (mid, AbcClass::B, dec(150)),
            (low, AbcClass::C, dec(50)),
        ]
    );
    assert_eq!(
        (analysis.summary.a, analysis.summary.b, analysis.summary.c, analysis.summary.total),
        (1, 1, 1, 3)
    );

    let stored = fx.engine.get_balance(high, l).await.unwrap();
    assert_eq!(stored.abc_classification, Some(AbcClass::A));
    let stored = fx.engine.get_balance(low, l).await.unwrap();
    assert_eq!(stored.abc_classification, Some(AbcClass::C));
}

#[tokio::test]
async fn test_abc_only_counts_issues_at_the_location() {
    let fx = Fixture::new();
    let (x, y) = (fx.location(), fx.location());
    let p = fx.product();

    fx.receive(p, x, 10, 3, "A").await;
    fx.engine
        .transfer_inventory(transfer(x, y, p, 4), fx.actor)
        .await
        .unwrap();
    fx.engine.issue_inventory(issue(&[(p, y, 2)]), fx.actor).await.unwrap();

    let today = Utc::now().date_naive();
    let at_x = fx.engine.perform_abc_analysis(x, today).await.unwrap();
    assert!(at_x.products.is_empty());

    let at_y = fx.engine.perform_abc_analysis(y, today).await.unwrap();
    assert_eq!(at_y.products.len(), 1);
    assert_eq!(at_y.products[0].total_consumption, 2);
    assert_eq!(at_y.products[0].total_value, dec(6));
}

#[tokio::test]
async fn test_abc_window_ends_with_as_of_day() {
    let fx = Fixture::new();
    let l = fx.location();
    let p = fx.product();
    fx.receive(p, l, 10, 1, "A").await;
    fx.engine.issue_inventory(issue(&[(p, l, 3)]), fx.actor).await.unwrap();

    let last_year = Utc::now().date_naive() - chrono::Duration::days(400);
    let analysis = fx.engine.perform_abc_analysis(l, last_year).await.unwrap();
    assert!(analysis.products.is_empty());
}
