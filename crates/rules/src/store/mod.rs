//! Narrow query interface to the relational store holding rules, metrics
//! and the action log.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::schema::{ActionLogEntry, MetricRecord, RuleRow};

/// Errors surfaced by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A query or write was rejected.
    #[error("Query failed: {0}")]
    Query(String),

    /// A row could not be decoded into its domain type.
    #[error("Row decode failed: {0}")]
    Decode(String),
}

/// Everything the automation engine reads from or writes to the store.
///
/// Implementations must be safe to share across concurrently running rules.
#[async_trait::async_trait]
pub trait AutomationStore: Send + Sync {
    /// All rules with `is_active = true`, across every user.
    async fn active_rules(&self) -> Result<Vec<RuleRow>, StoreError>;

    /// Metric rows for `user_id` dated on or after `since`.
    async fn metrics_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<MetricRecord>, StoreError>;

    /// Append one entry to the action log.
    async fn append_action_log(&self, entry: &ActionLogEntry) -> Result<(), StoreError>;

    /// Set a rule's `last_triggered_at`. Last writer wins.
    async fn mark_triggered(&self, rule_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}
