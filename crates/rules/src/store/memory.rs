//! In-process [`AutomationStore`] with failure injection.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AutomationStore, StoreError};
use crate::schema::{ActionLogEntry, MetricRecord, RuleRow};

#[derive(Default)]
struct Inner {
    rules: Vec<RuleRow>,
    metrics: Vec<MetricRecord>,
    action_log: Vec<ActionLogEntry>,
    fail_rules_query: bool,
    failing_metric_users: HashSet<Uuid>,
    failing_log_rules: HashSet<Uuid>,
    failing_trigger_rules: HashSet<Uuid>,
}

/// Store backed by in-memory vectors.
///
/// Mirrors the SQL semantics of the PostgreSQL store: only active rules are
/// returned, metric rows are filtered by user and `date >= since`, and the
/// action log is append-only.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_rule(&self, rule: RuleRow) {
        self.inner.write().await.rules.push(rule);
    }

    pub async fn insert_metric(&self, record: MetricRecord) {
        self.inner.write().await.metrics.push(record);
    }

    /// Snapshot of every log entry written so far, in append order.
    pub async fn action_log(&self) -> Vec<ActionLogEntry> {
        self.inner.read().await.action_log.clone()
    }

    pub async fn rule(&self, rule_id: Uuid) -> Option<RuleRow> {
        self.inner
            .read()
            .await
            .rules
            .iter()
            .find(|r| r.id == rule_id)
            .cloned()
    }

    /// Make `active_rules` fail.
    pub async fn fail_rules_query(&self) {
        self.inner.write().await.fail_rules_query = true;
    }

    /// Make `metrics_since` fail for one user.
    pub async fn fail_metrics_for(&self, user_id: Uuid) {
        self.inner.write().await.failing_metric_users.insert(user_id);
    }

    /// Make `append_action_log` fail for entries of one rule.
    pub async fn fail_log_writes_for(&self, rule_id: Uuid) {
        self.inner.write().await.failing_log_rules.insert(rule_id);
    }

    /// Make `mark_triggered` fail for one rule.
    pub async fn fail_trigger_updates_for(&self, rule_id: Uuid) {
        self.inner.write().await.failing_trigger_rules.insert(rule_id);
    }
}

#[async_trait::async_trait]
impl AutomationStore for MemoryStore {
    async fn active_rules(&self) -> Result<Vec<RuleRow>, StoreError> {
        let inner = self.inner.read().await;
        if inner.fail_rules_query {
            return Err(StoreError::Query("automation_rules query rejected".to_string()));
        }
        Ok(inner.rules.iter().filter(|r| r.is_active).cloned().collect())
    }

    async fn metrics_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<MetricRecord>, StoreError> {
        let inner = self.inner.read().await;
        if inner.failing_metric_users.contains(&user_id) {
            return Err(StoreError::Query(format!(
                "ad_metrics query rejected for user {}",
                user_id
            )));
        }
        Ok(inner
            .metrics
            .iter()
            .filter(|m| m.user_id == user_id && m.date >= since)
            .cloned()
            .collect())
    }

    async fn append_action_log(&self, entry: &ActionLogEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.failing_log_rules.contains(&entry.rule_id) {
            return Err(StoreError::Query(format!(
                "actions_log insert rejected for rule {}",
                entry.rule_id
            )));
        }
        inner.action_log.push(entry.clone());
        Ok(())
    }

    async fn mark_triggered(&self, rule_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.failing_trigger_rules.contains(&rule_id) {
            return Err(StoreError::Query(format!(
                "last_triggered_at update rejected for rule {}",
                rule_id
            )));
        }
        if let Some(rule) = inner.rules.iter_mut().find(|r| r.id == rule_id) {
            rule.last_triggered_at = Some(at);
        }
        Ok(())
    }
}
