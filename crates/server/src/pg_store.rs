//! PostgreSQL implementation of [`AutomationStore`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use adpilot_rules::schema::{ActionLogEntry, MetricRecord, RuleRow};
use adpilot_rules::store::{AutomationStore, StoreError};

const ACTIVE_RULES_SQL: &str = "\
    SELECT id, user_id, rule_name, rule_description, conditions, actions, \
           COALESCE(is_active, false) AS is_active, last_triggered_at \
    FROM automation_rules \
    WHERE is_active = true";

// Metric columns are nullable; a missing value contributes zero to the sums.
const METRICS_SINCE_SQL: &str = "\
    SELECT user_id, date_start, \
           COALESCE(impressions, 0)::BIGINT AS impressions, \
           COALESCE(clicks, 0)::BIGINT AS clicks, \
           COALESCE(spend, 0)::DOUBLE PRECISION AS spend, \
           COALESCE(conversions, 0)::BIGINT AS conversions, \
           COALESCE(conversion_value, 0)::DOUBLE PRECISION AS conversion_value \
    FROM ad_metrics \
    WHERE user_id = $1 AND date_start >= $2";

const INSERT_ACTION_LOG_SQL: &str = "\
    INSERT INTO actions_log \
        (id, user_id, rule_id, action_type, target_type, target_id, \
         action_details, status, error_message, executed_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";

const MARK_TRIGGERED_SQL: &str =
    "UPDATE automation_rules SET last_triggered_at = $1 WHERE id = $2";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Decode(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

fn decode_rule(row: &PgRow) -> Result<RuleRow, sqlx::Error> {
    Ok(RuleRow {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        rule_name: row.try_get("rule_name")?,
        rule_description: row.try_get("rule_description")?,
        conditions: row.try_get("conditions")?,
        actions: row.try_get("actions")?,
        is_active: row.try_get("is_active")?,
        last_triggered_at: row.try_get("last_triggered_at")?,
    })
}

fn decode_metric(row: &PgRow) -> Result<MetricRecord, sqlx::Error> {
    Ok(MetricRecord {
        user_id: row.try_get("user_id")?,
        date: row.try_get("date_start")?,
        impressions: row.try_get("impressions")?,
        clicks: row.try_get("clicks")?,
        spend: row.try_get("spend")?,
        conversions: row.try_get("conversions")?,
        conversion_value: row.try_get("conversion_value")?,
    })
}

#[async_trait]
impl AutomationStore for PgStore {
    async fn active_rules(&self) -> Result<Vec<RuleRow>, StoreError> {
        let rows = sqlx::query(ACTIVE_RULES_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter()
            .map(|row| decode_rule(row).map_err(map_sqlx_error))
            .collect()
    }

    async fn metrics_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<MetricRecord>, StoreError> {
        let rows = sqlx::query(METRICS_SINCE_SQL)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter()
            .map(|row| decode_metric(row).map_err(map_sqlx_error))
            .collect()
    }

    async fn append_action_log(&self, entry: &ActionLogEntry) -> Result<(), StoreError> {
        sqlx::query(INSERT_ACTION_LOG_SQL)
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(entry.rule_id)
            .bind(entry.action_type.as_str())
            .bind(entry.target_type.as_str())
            .bind(&entry.target_id)
            .bind(Json(&entry.details))
            .bind(entry.status.as_str())
            .bind(entry.error_message.as_deref())
            .bind(entry.executed_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn mark_triggered(&self, rule_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(MARK_TRIGGERED_SQL)
            .bind(at)
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
