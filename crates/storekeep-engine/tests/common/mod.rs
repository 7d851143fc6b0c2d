#![allow(dead_code)]

use std::sync::Arc;

use storekeep_core::{Actor, Customer, Money, Product};
use storekeep_db::{Database, DbConfig};
use storekeep_engine::{Engine, EngineConfig, NewCustomer, NewProduct, StaticIdentity};

pub fn cashier() -> Actor {
    Actor::new("u-caixa-1", "Caixa 1")
}

/// Fast retries so a contended test never sleeps for long.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.retry.initial_backoff_ms = 5;
    config.retry.max_backoff_ms = 50;
    config
}

pub async fn engine_with(db: Database, config: &EngineConfig) -> Engine {
    Engine::with_database(db, config, Arc::new(StaticIdentity::new(cashier())))
}

pub async fn memory_engine() -> Engine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    engine_with(db, &test_config()).await
}

pub async fn product(engine: &Engine, name: &str, price_major: i64, stock: i64) -> Product {
    engine
        .catalog()
        .create_product(NewProduct {
            name: name.to_string(),
            category: "Camisetas".to_string(),
            price: Money::from_major(price_major),
            stock,
            low_stock_alert: 2,
        })
        .await
        .unwrap()
}

pub async fn customer(engine: &Engine, name: &str, phone: &str) -> Customer {
    engine
        .customers()
        .register_customer(NewCustomer {
            name: name.to_string(),
            phone: phone.to_string(),
            email: None,
            cpf: None,
        })
        .await
        .unwrap()
}
