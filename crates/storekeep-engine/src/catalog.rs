//! # Catalog Service
//!
//! Product CRUD, stock adjustments outside of sales, and the stock health
//! report. Every write invalidates the `Products` cache kind.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use storekeep_core::validation::{
    validate_category, validate_low_stock_alert, validate_price_cents, validate_product_name,
    validate_stock,
};
use storekeep_core::{Money, Product, StockHealthReport, ValidationError};
use storekeep_db::{generate_product_id, Database, DbError};

use crate::activity::{Action, ActivityLog, Entity};
use crate::cache::{Cache, CacheKind};
use crate::error::{EngineError, EngineResult};
use crate::identity::Identity;

const ACTIVE_SCOPE: &str = "active";

/// Input for [`CatalogService::create_product`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Money,
    pub stock: i64,
    pub low_stock_alert: i64,
}

/// Partial update; `None` leaves the field as it is. Stock is not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub low_stock_alert: Option<i64>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Database,
    cache: Arc<Cache>,
    activity: ActivityLog,
    identity: Arc<dyn Identity>,
}

impl CatalogService {
    pub fn new(
        db: Database,
        cache: Arc<Cache>,
        activity: ActivityLog,
        identity: Arc<dyn Identity>,
    ) -> Self {
        CatalogService {
            db,
            cache,
            activity,
            identity,
        }
    }

    pub async fn create_product(&self, input: NewProduct) -> EngineResult<Product> {
        let name = validate_product_name(&input.name)?;
        let category = validate_category(&input.category)?;
        validate_price_cents(input.price.cents())?;
        validate_stock(input.stock)?;
        validate_low_stock_alert(input.low_stock_alert)?;

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name,
            category,
            price: input.price,
            stock: input.stock,
            low_stock_alert: input.low_stock_alert,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.products().insert(&product).await?;
        self.cache.invalidate(CacheKind::Products).await;

        self.activity.record(
            &self.identity.current_actor(),
            Action::ProductCreated,
            Entity::product(&product.id),
            json!({ "name": product.name, "price": product.price.cents(), "stock": product.stock }),
        );

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> EngineResult<Product> {
        let mut product = self.get_product(id).await?;

        if let Some(name) = update.name.as_deref() {
            product.name = validate_product_name(name)?;
        }
        if let Some(category) = update.category.as_deref() {
            product.category = validate_category(category)?;
        }
        if let Some(price) = update.price {
            validate_price_cents(price.cents())?;
            product.price = price;
        }
        if let Some(threshold) = update.low_stock_alert {
            validate_low_stock_alert(threshold)?;
            product.low_stock_alert = threshold;
        }
        product.updated_at = Utc::now();

        self.db.products().update_details(&product).await?;
        self.cache.invalidate(CacheKind::Products).await;

        self.activity.record(
            &self.identity.current_actor(),
            Action::ProductUpdated,
            Entity::product(&product.id),
            json!({ "name": product.name, "price": product.price.cents() }),
        );

        Ok(product)
    }

    /// Adds `quantity` units (delivery received).
    pub async fn restock(&self, id: &str, quantity: i64) -> EngineResult<Product> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        self.db.products().restock(id, quantity, Utc::now()).await?;
        self.cache.invalidate(CacheKind::Products).await;

        self.activity.record(
            &self.identity.current_actor(),
            Action::StockAdjusted,
            Entity::product(id),
            json!({ "delta": quantity }),
        );

        info!(product_id = %id, quantity, "Product restocked");
        self.get_product(id).await
    }

    /// Sets stock to a counted value.
    pub async fn adjust_stock(&self, id: &str, new_stock: i64) -> EngineResult<Product> {
        validate_stock(new_stock)?;

        self.db.products().set_stock(id, new_stock, Utc::now()).await?;
        self.cache.invalidate(CacheKind::Products).await;

        self.activity.record(
            &self.identity.current_actor(),
            Action::StockAdjusted,
            Entity::product(id),
            json!({ "stock": new_stock }),
        );

        info!(product_id = %id, stock = new_stock, "Product stock set");
        self.get_product(id).await
    }

    /// Soft delete: hidden from the catalog and unsellable, history intact.
    pub async fn deactivate_product(&self, id: &str) -> EngineResult<()> {
        self.db.products().deactivate(id, Utc::now()).await?;
        self.cache.invalidate(CacheKind::Products).await;

        self.activity.record(
            &self.identity.current_actor(),
            Action::ProductUpdated,
            Entity::product(id),
            json!({ "isActive": false }),
        );

        Ok(())
    }

    /// Hard delete. Refused while any sale line references the product.
    pub async fn delete_product(&self, id: &str) -> EngineResult<()> {
        match self.db.products().delete(id).await {
            Ok(()) => {}
            Err(DbError::ForeignKeyViolation { .. }) => {
                return Err(EngineError::ConstraintViolation(format!(
                    "product {id} is referenced by recorded sales"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        self.cache.invalidate(CacheKind::Products).await;

        self.activity.record(
            &self.identity.current_actor(),
            Action::ProductDeleted,
            Entity::product(id),
            json!({}),
        );

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_product(&self, id: &str) -> EngineResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", id))
    }

    /// Active products, cached.
    pub async fn list_products(&self) -> EngineResult<Vec<Product>> {
        let products = self.db.products();
        self.cache
            .get_or_load(CacheKind::Products, ACTIVE_SCOPE, || async {
                Ok::<_, EngineError>(products.list_active().await?)
            })
            .await
    }

    pub async fn stock_health(&self) -> EngineResult<StockHealthReport> {
        let products = self.list_products().await?;
        Ok(StockHealthReport::from_products(&products))
    }
}
