//! End-to-end: register customer → record sale → statistics → cancel →
//! insights, on an in-memory store.

mod common;

use chrono::{Duration, Utc};

use common::{cashier, customer, memory_engine, product};
use storekeep_core::{CartLine, CustomerSegment, Money, SaleStatus};
use storekeep_engine::{EngineError, ProductUpdate};

#[tokio::test]
async fn test_sale_updates_stock_and_customer() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta Básica", 50, 10).await;
    let ana = customer(&engine, "Ana Souza", "(11) 98888-0001").await;

    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 3)], None, Some(&ana.id))
        .await
        .unwrap();

    assert_eq!(recorded.sale.total, Money::from_major(150));
    assert_eq!(recorded.sale.seller_id, cashier().id);
    assert_eq!(recorded.sale.items[0].unit_price, Money::from_major(50));
    recorded.customer_update.unwrap().await.unwrap();

    let shirt = engine.catalog().get_product(&shirt.id).await.unwrap();
    assert_eq!(shirt.stock, 7);

    let ana = engine.customers().get_customer(&ana.id).await.unwrap();
    assert_eq!(ana.metrics.total_purchases, 1);
    assert_eq!(ana.metrics.total_spent, Money::from_major(150));
    assert_eq!(ana.metrics.loyalty_points, 15);
    assert_eq!(ana.metrics.segment, CustomerSegment::Bronze);
    assert_eq!(ana.metrics.favorite_categories[0].key, "Camisetas");
    assert!(ana.metrics.last_purchase_date.is_some());

    let history = engine.customers().purchase_history(&ana.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_sale_without_customer_has_no_stats_task() {
    let engine = memory_engine().await;
    let cap = product(&engine, "Boné", 40, 5).await;

    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&cap.id, 1)], None, None)
        .await
        .unwrap();

    assert!(recorded.customer_update.is_none());
    assert!(recorded.sale.customer_id.is_none());
}

#[tokio::test]
async fn test_premium_after_fifth_purchase() {
    let engine = memory_engine().await;
    let kit = product(&engine, "Kit Presente", 400, 10).await;
    let bia = customer(&engine, "Beatriz Lima", "11977770002").await;

    // history from before this terminal: 4 purchases, 1800.00 spent
    engine
        .database()
        .customers()
        .apply_metrics(&bia.id, |c| {
            let mut c = c.clone();
            c.metrics.total_purchases = 4;
            c.metrics.total_spent = Money::from_major(1800);
            c.metrics.average_ticket = Money::from_major(450);
            c
        })
        .await
        .unwrap();

    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&kit.id, 1)], None, Some(&bia.id))
        .await
        .unwrap();
    recorded.customer_update.unwrap().await.unwrap();

    let bia = engine.customers().get_customer(&bia.id).await.unwrap();
    assert_eq!(bia.metrics.total_purchases, 5);
    assert_eq!(bia.metrics.total_spent, Money::from_major(2200));
    assert_eq!(bia.metrics.average_ticket, Money::from_major(440));
    assert_eq!(bia.metrics.segment, CustomerSegment::Premium);
}

#[tokio::test]
async fn test_oversell_is_rejected_and_stock_untouched() {
    let engine = memory_engine().await;
    let mug = product(&engine, "Caneca", 30, 2).await;

    let err = engine
        .ledger()
        .record_sale(vec![CartLine::new(&mug.id, 3)], None, None)
        .await
        .unwrap_err();

    match err {
        EngineError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(engine.catalog().get_product(&mug.id).await.unwrap().stock, 2);
    assert!(engine.ledger().recent_sales(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_split_lines_are_checked_together() {
    let engine = memory_engine().await;
    let mug = product(&engine, "Caneca", 30, 3).await;

    let err = engine
        .ledger()
        .record_sale(
            vec![CartLine::new(&mug.id, 2), CartLine::new(&mug.id, 2)],
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientStock { available: 3, requested: 4, .. }));
    assert_eq!(engine.catalog().get_product(&mug.id).await.unwrap().stock, 3);
}

#[tokio::test]
async fn test_unknown_references_are_not_found() {
    let engine = memory_engine().await;
    let mug = product(&engine, "Caneca", 30, 3).await;

    let err = engine
        .ledger()
        .record_sale(vec![CartLine::new("missing", 1)], None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let err = engine
        .ledger()
        .record_sale(vec![CartLine::new(&mug.id, 1)], None, Some("no-such-customer"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    engine.catalog().deactivate_product(&mug.id).await.unwrap();
    let err = engine
        .ledger()
        .record_sale(vec![CartLine::new(&mug.id, 1)], None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_invalid_cart_is_a_validation_error() {
    let engine = memory_engine().await;

    let err = engine.ledger().record_sale(vec![], None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let mug = product(&engine, "Caneca", 30, 3).await;
    let err = engine
        .ledger()
        .record_sale(vec![CartLine::new(&mug.id, 0)], None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_cancel_restores_stock_and_keeps_stats() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 10).await;
    let short = product(&engine, "Bermuda", 80, 4).await;
    let ana = customer(&engine, "Ana Souza", "11988880001").await;

    let recorded = engine
        .ledger()
        .record_sale(
            vec![CartLine::new(&shirt.id, 2), CartLine::new(&short.id, 1)],
            None,
            Some(&ana.id),
        )
        .await
        .unwrap();
    recorded.customer_update.unwrap().await.unwrap();

    let cancelled = engine
        .ledger()
        .cancel_sale(&recorded.sale.id, "Cliente desistiu")
        .await
        .unwrap();

    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    let info = cancelled.cancellation.unwrap();
    assert_eq!(info.cancelled_by, cashier().id);
    assert_eq!(info.reason, "Cliente desistiu");

    assert_eq!(engine.catalog().get_product(&shirt.id).await.unwrap().stock, 10);
    assert_eq!(engine.catalog().get_product(&short.id).await.unwrap().stock, 4);

    let ana = engine.customers().get_customer(&ana.id).await.unwrap();
    assert_eq!(ana.metrics.total_purchases, 1);
    assert_eq!(ana.metrics.total_spent, Money::from_major(180));
}

#[tokio::test]
async fn test_double_cancel_is_rejected() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 10).await;

    let sale = engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 1)], None, None)
        .await
        .unwrap()
        .sale;

    engine.ledger().cancel_sale(&sale.id, "Troca").await.unwrap();
    let err = engine.ledger().cancel_sale(&sale.id, "Troca").await.unwrap_err();

    assert!(matches!(err, EngineError::AlreadyCancelled { .. }));
    // stock restored once
    assert_eq!(engine.catalog().get_product(&shirt.id).await.unwrap().stock, 10);

    let err = engine.ledger().cancel_sale("no-such-sale", "Troca").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let err = engine.ledger().cancel_sale(&sale.id, "   ").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_sale_keeps_price_snapshot() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 10).await;

    let sale = engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 1)], None, None)
        .await
        .unwrap()
        .sale;

    engine
        .catalog()
        .update_product(
            &shirt.id,
            ProductUpdate {
                price: Some(Money::from_major(65)),
                name: Some("Camiseta Premium".into()),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();

    let stored = engine.ledger().get_sale(&sale.id).await.unwrap();
    assert_eq!(stored.items[0].unit_price, Money::from_major(50));
    assert_eq!(stored.items[0].name, "Camiseta");
    assert_eq!(stored.total, Money::from_major(50));
}

#[tokio::test]
async fn test_sales_summary_over_range() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 10).await;

    let first = engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 2)], None, None)
        .await
        .unwrap()
        .sale;
    engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 1)], None, None)
        .await
        .unwrap();
    engine.ledger().cancel_sale(&first.id, "Erro de digitação").await.unwrap();

    let now = Utc::now();
    let summary = engine
        .ledger()
        .sales_summary(now - Duration::hours(1), now + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.gross_revenue, Money::from_major(50));
    assert_eq!(summary.units_sold, 1);

    let err = engine
        .ledger()
        .sales_between(now, now - Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_sale_dated_at_range_end_is_included() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 10).await;

    let sale = engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 1)], None, None)
        .await
        .unwrap()
        .sale;
    let to = sale.sold_at;

    let last_day = engine
        .ledger()
        .sales_between(to - Duration::days(1), to)
        .await
        .unwrap();
    assert_eq!(last_day.len(), 1);
    assert_eq!(last_day[0].id, sale.id);

    let summary = engine.ledger().sales_summary(to, to).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.gross_revenue, Money::from_major(50));
}

#[tokio::test]
async fn test_bulk_quantity_limited_only_by_stock() {
    let engine = memory_engine().await;
    let screws = product(&engine, "Parafuso", 1, 5000).await;

    let sale = engine
        .ledger()
        .record_sale(vec![CartLine::new(&screws.id, 1000)], None, None)
        .await
        .unwrap()
        .sale;
    assert_eq!(sale.total, Money::from_major(1000));
    assert_eq!(engine.catalog().get_product(&screws.id).await.unwrap().stock, 4000);

    let err = engine
        .ledger()
        .record_sale(vec![CartLine::new(&screws.id, 4001)], None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientStock { available: 4000, requested: 4001, .. }
    ));
}

#[tokio::test]
async fn test_insights_follow_customer_writes() {
    let engine = memory_engine().await;
    let kit = product(&engine, "Kit Presente", 400, 10).await;
    let ana = customer(&engine, "Ana Souza", "11988880001").await;

    let before = engine.insights().insights().await.unwrap();
    assert_eq!(before.total_customers, 1);
    assert_eq!(before.customers_with_purchases, 0);

    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&kit.id, 1)], None, Some(&ana.id))
        .await
        .unwrap();
    recorded.customer_update.unwrap().await.unwrap();
    customer(&engine, "Bruno Alves", "11988880002").await;

    let after = engine.insights().insights().await.unwrap();
    assert_eq!(after.total_customers, 2);
    assert_eq!(after.customers_with_purchases, 1);
    assert_eq!(after.total_revenue, Money::from_major(400));
    assert_eq!(after.top_customers[0].id, ana.id);
    assert_eq!(after.new_customers_this_month, 2);
}

#[tokio::test]
async fn test_activity_trail_is_written() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 10).await;
    let ana = customer(&engine, "Ana Souza", "11988880001").await;

    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 1)], None, Some(&ana.id))
        .await
        .unwrap();
    recorded.customer_update.unwrap().await.unwrap();

    // detached writers, give them a moment
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let actions: Vec<String> = engine
        .database()
        .activities()
        .recent(10)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.action)
        .collect();
    assert!(actions.contains(&"product_created".to_string()));
    assert!(actions.contains(&"sale_recorded".to_string()));

    let customer_actions: Vec<String> = engine
        .database()
        .activities()
        .for_customer(&ana.id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.action)
        .collect();
    assert!(customer_actions.contains(&"customer_registered".to_string()));
    assert!(customer_actions.contains(&"purchase_recorded".to_string()));
}
