//! Automation rule row as stored, and its validated form.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Action, Condition};
use crate::error::RuleError;

/// An automation rule exactly as the store returns it.
///
/// `conditions` and `actions` are raw JSON: the dashboard writes either a
/// single object or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rule_name: String,
    #[serde(default)]
    pub rule_description: Option<String>,
    pub conditions: Value,
    pub actions: Value,
    pub is_active: bool,
    #[serde(default)]
    pub last_triggered_at: Option<DateTime<Utc>>,
}

/// A validated automation rule.
///
/// `conditions` and `actions` are never empty. All conditions must hold for
/// the rule to trigger; all actions then execute together.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub is_active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
}

impl TryFrom<RuleRow> for AutomationRule {
    type Error = RuleError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let rule_id = row.id;
        let invalid = move |reason: String| RuleError::InvalidRule { rule_id, reason };

        let conditions: Vec<Condition> =
            one_or_many(row.conditions.clone(), "conditions").map_err(invalid)?;
        let actions: Vec<Action> = one_or_many(row.actions.clone(), "actions").map_err(invalid)?;

        for (i, condition) in conditions.iter().enumerate() {
            if !condition.value.is_finite() || condition.value < 0.0 {
                return Err(invalid(format!(
                    "conditions[{}]: threshold must be a non-negative number, got {}",
                    i, condition.value
                )));
            }
        }

        for (i, action) in actions.iter().enumerate() {
            match action.value {
                Some(v) if !v.is_finite() || v < 0.0 => {
                    return Err(invalid(format!(
                        "actions[{}]: value must be a non-negative percentage, got {}",
                        i, v
                    )));
                }
                None if action.action_type.requires_value() => {
                    return Err(invalid(format!(
                        "actions[{}]: {} requires a percentage value",
                        i, action.action_type
                    )));
                }
                _ => {}
            }
        }

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            name: row.rule_name,
            description: row.rule_description,
            conditions,
            actions,
            is_active: row.is_active,
            last_triggered_at: row.last_triggered_at,
        })
    }
}

/// Decode a JSON column holding either a single object or an array of them.
///
/// A bare object becomes a one-element `Vec`. Empty arrays, scalars and
/// elements that fail to deserialize are rejected.
fn one_or_many<T: DeserializeOwned>(value: Value, field: &str) -> Result<Vec<T>, String> {
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        Value::Null => return Err(format!("{} is missing", field)),
        other => {
            return Err(format!(
                "{} must be an object or an array, got {}",
                field, other
            ))
        }
    };

    if items.is_empty() {
        return Err(format!("{} must not be empty", field));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| format!("{}[{}]: {}", field, i, e))
        })
        .collect()
}
