//! # Activity Repository
//!
//! Append-only audit trail: `activities` (system-wide) and
//! `customer_activities` (per customer). Entries are never updated.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use storekeep_core::{ActivityRecord, CustomerActivity};

fn metadata_from(raw: String) -> DbResult<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(&raw)?)
}

fn activity_from_row(row: &SqliteRow) -> DbResult<ActivityRecord> {
    Ok(ActivityRecord {
        id: row.try_get("id")?,
        actor_id: row.try_get("actor_id")?,
        actor_name: row.try_get("actor_name")?,
        action: row.try_get("action")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        metadata: metadata_from(row.try_get("metadata")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn customer_activity_from_row(row: &SqliteRow) -> DbResult<CustomerActivity> {
    Ok(CustomerActivity {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        actor_id: row.try_get("actor_id")?,
        action: row.try_get("action")?,
        metadata: metadata_from(row.try_get("metadata")?)?,
        created_at: row.try_get("created_at")?,
    })
}

/// Repository for audit trail inserts and reads.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Appends a system activity.
    pub async fn insert_activity(&self, record: &ActivityRecord) -> DbResult<()> {
        debug!(action = %record.action, actor = %record.actor_id, "Recording activity");

        sqlx::query(
            r#"
            INSERT INTO activities (
                id, actor_id, actor_name, action, entity_type, entity_id, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.id)
        .bind(&record.actor_id)
        .bind(&record.actor_name)
        .bind(&record.action)
        .bind(record.entity_type.as_deref())
        .bind(record.entity_id.as_deref())
        .bind(serde_json::to_string(&record.metadata)?)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Appends a customer-scoped activity.
    pub async fn insert_customer_activity(&self, record: &CustomerActivity) -> DbResult<()> {
        debug!(action = %record.action, customer = %record.customer_id, "Recording customer activity");

        sqlx::query(
            r#"
            INSERT INTO customer_activities (
                id, customer_id, actor_id, action, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&record.id)
        .bind(&record.customer_id)
        .bind(&record.actor_id)
        .bind(&record.action)
        .bind(serde_json::to_string(&record.metadata)?)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent system activities, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<ActivityRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, actor_id, actor_name, action, entity_type, entity_id, metadata, created_at
            FROM activities
            ORDER BY created_at DESC, id
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(activity_from_row).collect()
    }

    /// A customer's activity history, newest first.
    pub async fn for_customer(&self, customer_id: &str) -> DbResult<Vec<CustomerActivity>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, actor_id, action, metadata, created_at
            FROM customer_activities
            WHERE customer_id = ?1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(customer_activity_from_row).collect()
    }
}

/// Helper to generate a new activity ID.
pub fn generate_activity_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn activity(action: &str, minutes_ago: i64) -> ActivityRecord {
        ActivityRecord {
            id: generate_activity_id(),
            actor_id: "u-1".to_string(),
            actor_name: "Caixa 1".to_string(),
            action: action.to_string(),
            entity_type: Some("sale".to_string()),
            entity_id: Some("s-1".to_string()),
            metadata: json!({ "total": 4000 }),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_recent_newest_first_with_limit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.activities();
        repo.insert_activity(&activity("sale_created", 10)).await.unwrap();
        repo.insert_activity(&activity("sale_cancelled", 1)).await.unwrap();
        repo.insert_activity(&activity("product_created", 30)).await.unwrap();

        let recent = repo.recent(2).await.unwrap();
        let actions: Vec<&str> = recent.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["sale_cancelled", "sale_created"]);
        assert_eq!(recent[1].metadata["total"], 4000);
    }

    #[tokio::test]
    async fn test_customer_history() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.activities();
        for (customer, action) in [("c-1", "purchase"), ("c-2", "purchase"), ("c-1", "updated")] {
            repo.insert_customer_activity(&CustomerActivity {
                id: generate_activity_id(),
                customer_id: customer.to_string(),
                actor_id: "u-1".to_string(),
                action: action.to_string(),
                metadata: json!({}),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let history = repo.for_customer("c-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|a| a.customer_id == "c-1"));
        assert!(repo.for_customer("c-9").await.unwrap().is_empty());
    }
}
