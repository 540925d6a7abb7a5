//! Error types for rule loading, evaluation and execution.

use uuid::Uuid;

use crate::platform::PlatformError;
use crate::store::StoreError;

/// Errors that can occur while processing automation rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Stored rule payload failed validation at the store boundary.
    #[error("Invalid rule {rule_id}: {reason}")]
    InvalidRule { rule_id: Uuid, reason: String },

    /// A query or write against the backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The ad platform refused an action.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// One or more condition metric queries failed; the rule did not fire.
    #[error("Metric query failed for {failed} of {total} condition(s): {first}")]
    ConditionQuery {
        failed: usize,
        total: usize,
        first: String,
    },

    /// One or more actions of a triggered rule failed.
    #[error("{failed} of {total} action(s) failed: {first}")]
    ActionsFailed {
        failed: usize,
        total: usize,
        first: String,
    },

    /// The rule's task panicked or was cancelled.
    #[error("Rule task aborted: {0}")]
    TaskAborted(String),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
