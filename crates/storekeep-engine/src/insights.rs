//! # Insights Aggregator
//!
//! Cached dashboard summary over the active customer base. The math lives
//! in `storekeep_core::insights`; this layer only decides where the
//! customers come from and how long the result is kept.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use storekeep_core::insights::compute;
use storekeep_core::{CustomerInsights, InsightsParams};
use storekeep_db::Database;

use crate::cache::{Cache, CacheKind};
use crate::customers::active_customers;
use crate::error::{EngineError, EngineResult};

const SUMMARY_SCOPE: &str = "summary";

#[derive(Debug, Clone)]
pub struct InsightsAggregator {
    db: Database,
    cache: Arc<Cache>,
    params: InsightsParams,
}

impl InsightsAggregator {
    pub fn new(db: Database, cache: Arc<Cache>, params: InsightsParams) -> Self {
        InsightsAggregator { db, cache, params }
    }

    pub fn params(&self) -> &InsightsParams {
        &self.params
    }

    /// The current summary. Recomputed at most once per analytics TTL
    /// unless a customer write invalidates it first.
    pub async fn insights(&self) -> EngineResult<CustomerInsights> {
        self.cache
            .get_or_load(CacheKind::Insights, SUMMARY_SCOPE, || async {
                let customers = active_customers(&self.db, &self.cache).await?;
                debug!(customers = customers.len(), "Computing customer insights");
                Ok::<_, EngineError>(compute(&customers, Utc::now(), &self.params))
            })
            .await
    }
}
