//! Catalog and customer services, and how their writes interact with the
//! cache.

mod common;

use std::time::Duration;

use chrono::Utc;

use common::{customer, engine_with, memory_engine, product, test_config};
use storekeep_core::{CartLine, CustomerSegment, CustomerStatus, Money, ValidationError};
use storekeep_db::{Database, DbConfig};
use storekeep_engine::{
    CacheKind, Connectivity, ConnectivitySignal, CustomerUpdate, EngineError, NewCustomer,
    NewProduct, ProductUpdate,
};

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_create_product_validates_input() {
    let engine = memory_engine().await;

    let base = NewProduct {
        name: "Vestido".into(),
        category: "Vestidos".into(),
        price: Money::from_major(120),
        stock: 3,
        low_stock_alert: 1,
    };

    let err = engine
        .catalog()
        .create_product(NewProduct { name: "  ".into(), ..base.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::Required { .. })));

    let err = engine
        .catalog()
        .create_product(NewProduct { price: Money::from_cents(-1), ..base.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .catalog()
        .create_product(NewProduct { stock: -1, ..base.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .catalog()
        .create_product(NewProduct { low_stock_alert: 0, ..base.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let created = engine.catalog().create_product(base).await.unwrap();
    assert!(created.is_active);
    assert_eq!(engine.catalog().list_products().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stock_adjustments() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 3).await;

    let restocked = engine.catalog().restock(&shirt.id, 7).await.unwrap();
    assert_eq!(restocked.stock, 10);

    let err = engine.catalog().restock(&shirt.id, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let counted = engine.catalog().adjust_stock(&shirt.id, 4).await.unwrap();
    assert_eq!(counted.stock, 4);

    let err = engine.catalog().adjust_stock(&shirt.id, -1).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.catalog().restock("missing", 1).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_update_product_leaves_stock_alone() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 3).await;

    let updated = engine
        .catalog()
        .update_product(
            &shirt.id,
            ProductUpdate {
                category: Some("Básicos".into()),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.category, "Básicos");
    assert_eq!(updated.name, "Camiseta");
    assert_eq!(updated.stock, 3);
}

#[tokio::test]
async fn test_delete_referenced_product_is_refused() {
    let engine = memory_engine().await;
    let sold = product(&engine, "Camiseta", 50, 3).await;
    let unsold = product(&engine, "Meia", 10, 3).await;

    engine
        .ledger()
        .record_sale(vec![CartLine::new(&sold.id, 1)], None, None)
        .await
        .unwrap();

    let err = engine.catalog().delete_product(&sold.id).await.unwrap_err();
    assert!(matches!(err, EngineError::ConstraintViolation(_)));
    assert!(engine.catalog().get_product(&sold.id).await.is_ok());

    engine.catalog().delete_product(&unsold.id).await.unwrap();
    let err = engine.catalog().get_product(&unsold.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_deactivated_products_leave_the_listing() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 3).await;
    product(&engine, "Meia", 10, 0).await;

    assert_eq!(engine.catalog().list_products().await.unwrap().len(), 2);
    engine.catalog().deactivate_product(&shirt.id).await.unwrap();

    let listed = engine.catalog().list_products().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Meia");

    let health = engine.catalog().stock_health().await.unwrap();
    assert_eq!(health.total_products, 1);
    assert_eq!(health.out_of_stock.len(), 1);
    assert_eq!(health.inventory_value, Money::zero());
}

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn test_listing_is_cached_until_ttl() {
    let mut config = test_config();
    config.cache.catalog_ttl_secs = 1;
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let engine = engine_with(db, &config).await;
    let shirt = product(&engine, "Camiseta", 50, 3).await;

    assert_eq!(engine.catalog().list_products().await.unwrap()[0].stock, 3);

    // a write behind the engine's back is not seen until the entry expires
    engine
        .database()
        .products()
        .set_stock(&shirt.id, 9, Utc::now())
        .await
        .unwrap();
    assert_eq!(engine.catalog().list_products().await.unwrap()[0].stock, 3);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(engine.catalog().list_products().await.unwrap()[0].stock, 9);
}

#[tokio::test]
async fn test_sale_invalidates_product_listing() {
    let engine = memory_engine().await;
    let shirt = product(&engine, "Camiseta", 50, 3).await;
    assert_eq!(engine.catalog().list_products().await.unwrap()[0].stock, 3);

    engine
        .ledger()
        .record_sale(vec![CartLine::new(&shirt.id, 2)], None, None)
        .await
        .unwrap();

    assert_eq!(engine.catalog().list_products().await.unwrap()[0].stock, 1);
}

// =============================================================================
// Customers
// =============================================================================

#[tokio::test]
async fn test_register_normalizes_and_dedups_phone() {
    let engine = memory_engine().await;
    let ana = engine
        .customers()
        .register_customer(NewCustomer {
            name: " Ana Souza ".into(),
            phone: "(11) 98888-0001".into(),
            email: Some("Ana@Example.com".into()),
            cpf: Some("123.456.789-09".into()),
        })
        .await
        .unwrap();

    assert_eq!(ana.name, "Ana Souza");
    assert_eq!(ana.phone, "11988880001");
    assert_eq!(ana.email.as_deref(), Some("ana@example.com"));
    assert_eq!(ana.cpf.as_deref(), Some("12345678909"));
    assert_eq!(ana.metrics.segment, CustomerSegment::New);
    assert_eq!(ana.metrics.total_purchases, 0);

    let err = engine
        .customers()
        .register_customer(NewCustomer {
            name: "Outra Ana".into(),
            phone: "11 98888 0001".into(),
            email: None,
            cpf: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::Duplicate { .. })));

    let found = engine.customers().find_by_phone("(11) 98888-0001").await.unwrap();
    assert_eq!(found.map(|c| c.id), Some(ana.id));
}

#[tokio::test]
async fn test_register_rejects_bad_contact() {
    let engine = memory_engine().await;

    for input in [
        NewCustomer { name: "".into(), phone: "11988880001".into(), email: None, cpf: None },
        NewCustomer { name: "Ana".into(), phone: "123".into(), email: None, cpf: None },
        NewCustomer {
            name: "Ana".into(),
            phone: "11988880001".into(),
            email: Some("ana.example.com".into()),
            cpf: None,
        },
        NewCustomer {
            name: "Ana".into(),
            phone: "11988880001".into(),
            email: None,
            cpf: Some("123".into()),
        },
    ] {
        let err = engine.customers().register_customer(input).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

#[tokio::test]
async fn test_update_contact_rechecks_phone() {
    let engine = memory_engine().await;
    let ana = customer(&engine, "Ana Souza", "11988880001").await;
    let bruno = customer(&engine, "Bruno Alves", "11988880002").await;

    let err = engine
        .customers()
        .update_contact(
            &bruno.id,
            CustomerUpdate {
                phone: Some("11988880001".into()),
                ..CustomerUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::Duplicate { .. })));

    // keeping one's own phone is fine
    let updated = engine
        .customers()
        .update_contact(
            &ana.id,
            CustomerUpdate {
                phone: Some("(11) 98888-0001".into()),
                email: Some("ana@loja.com.br".into()),
                ..CustomerUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email.as_deref(), Some("ana@loja.com.br"));

    let cleared = engine
        .customers()
        .update_contact(
            &ana.id,
            CustomerUpdate {
                email: Some(String::new()),
                ..CustomerUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.email.is_none());
}

#[tokio::test]
async fn test_deactivate_and_reactivate() {
    let engine = memory_engine().await;
    let kit = product(&engine, "Kit", 400, 10).await;
    let ana = customer(&engine, "Ana Souza", "11988880001").await;

    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&kit.id, 1)], None, Some(&ana.id))
        .await
        .unwrap();
    recorded.customer_update.unwrap().await.unwrap();
    assert_eq!(engine.customers().list_active_customers().await.unwrap().len(), 1);

    let inactive = engine.customers().deactivate_customer(&ana.id).await.unwrap();
    assert_eq!(inactive.status, CustomerStatus::Inactive);
    assert_eq!(inactive.metrics.segment, CustomerSegment::Inactive);
    assert!(engine.customers().list_active_customers().await.unwrap().is_empty());

    // purchases by an inactive customer still count, the segment stays pinned
    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&kit.id, 1)], None, Some(&ana.id))
        .await
        .unwrap();
    recorded.customer_update.unwrap().await.unwrap();
    let stored = engine.customers().get_customer(&ana.id).await.unwrap();
    assert_eq!(stored.metrics.total_purchases, 2);
    assert_eq!(stored.metrics.segment, CustomerSegment::Inactive);

    let active = engine.customers().reactivate_customer(&ana.id).await.unwrap();
    assert_eq!(active.status, CustomerStatus::Active);
    // 800.00 over 2 purchases: average 400.00 ≥ 300.00
    assert_eq!(active.metrics.segment, CustomerSegment::Premium);
}

#[tokio::test]
async fn test_refresh_risk_scores_only_touches_buyers() {
    let engine = memory_engine().await;
    let kit = product(&engine, "Kit", 100, 10).await;
    let ana = customer(&engine, "Ana Souza", "11988880001").await;
    let bruno = customer(&engine, "Bruno Alves", "11988880002").await;

    let recorded = engine
        .ledger()
        .record_sale(vec![CartLine::new(&kit.id, 1)], None, Some(&ana.id))
        .await
        .unwrap();
    recorded.customer_update.unwrap().await.unwrap();

    // a fresh purchase carries no risk
    assert_eq!(engine.customers().refresh_risk_scores(Utc::now()).await.unwrap(), 0);

    let later = Utc::now() + chrono::Duration::days(120);
    assert_eq!(engine.customers().refresh_risk_scores(later).await.unwrap(), 1);

    let ana = engine.customers().get_customer(&ana.id).await.unwrap();
    assert!(ana.metrics.risk_score > 0);
    let bruno = engine.customers().get_customer(&bruno.id).await.unwrap();
    assert_eq!(bruno.metrics.risk_score, 0);

    let score = engine.customers().loyalty_score(&ana, Utc::now());
    assert!(score <= 100);
}

#[tokio::test]
async fn test_purchase_history_requires_customer() {
    let engine = memory_engine().await;
    let err = engine.customers().purchase_history("missing").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

// =============================================================================
// Connectivity
// =============================================================================

#[tokio::test]
async fn test_link_flap_clears_engine_cache() {
    let engine = memory_engine().await;
    product(&engine, "Caneca", 25, 10).await;
    engine.catalog().list_products().await.unwrap();
    assert_eq!(engine.cache().len(CacheKind::Products).await, 1);

    let (signal, rx) = ConnectivitySignal::new(Connectivity::Online);
    let watcher = engine.watch_connectivity(rx);
    signal.set(Connectivity::Offline);
    signal.set(Connectivity::Online);
    drop(signal);
    watcher.await.unwrap();

    assert_eq!(engine.cache().len(CacheKind::Products).await, 0);
}
