//! Append-only audit record of executed actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActionTarget, ActionType};

/// Outcome recorded for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Success,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Success => "success",
            ActionStatus::Failed => "failed",
        }
    }
}

/// Structured details stored alongside each log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDetails {
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_value: Option<f64>,
    pub reason: String,
}

/// One row of the action log. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rule_id: Uuid,
    pub action_type: ActionType,
    pub target_type: ActionTarget,
    pub target_id: String,
    pub details: ActionDetails,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub executed_at: DateTime<Utc>,
}
