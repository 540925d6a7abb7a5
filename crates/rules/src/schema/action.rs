//! Action types executed when a rule triggers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An operation applied to a target scope when a rule triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Percentage for budget changes; ignored by other action types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub target: ActionTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Pause,
    Resume,
    BudgetIncrease,
    BudgetDecrease,
    Alert,
}

impl ActionType {
    /// Stored string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Pause => "pause",
            ActionType::Resume => "resume",
            ActionType::BudgetIncrease => "budget_increase",
            ActionType::BudgetDecrease => "budget_decrease",
            ActionType::Alert => "alert",
        }
    }

    /// Budget changes are meaningless without a percentage.
    pub fn requires_value(&self) -> bool {
        matches!(self, ActionType::BudgetIncrease | ActionType::BudgetDecrease)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTarget {
    Campaign,
    AdSet,
    Ad,
}

impl ActionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTarget::Campaign => "campaign",
            ActionTarget::AdSet => "ad_set",
            ActionTarget::Ad => "ad",
        }
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
