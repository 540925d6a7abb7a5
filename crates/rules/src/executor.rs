//! Executes one action of a triggered rule and records it.
//!
//! Per action: hand it to the [`AdPlatform`], append an [`ActionLogEntry`],
//! then stamp the rule's `last_triggered_at`. The log insert and the
//! timestamp update are independent writes; one failing does not stop the
//! other, and neither is rolled back.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::RuleError;
use crate::platform::AdPlatform;
use crate::schema::{Action, ActionDetails, ActionLogEntry, ActionStatus, AutomationRule};
use crate::store::AutomationStore;

/// Placeholder target id: metrics are aggregated per user, so a trigger
/// cannot be attributed to a specific campaign, ad set or ad.
pub fn target_id_for(rule_id: Uuid) -> String {
    format!("rule-triggered-{}", rule_id)
}

/// Human-readable reason stored in the log entry details.
pub fn trigger_reason(rule_name: &str) -> String {
    format!("Automated action triggered by rule: {}", rule_name)
}

#[derive(Clone)]
pub struct ActionExecutor {
    store: Arc<dyn AutomationStore>,
    platform: Arc<dyn AdPlatform>,
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn AutomationStore>, platform: Arc<dyn AdPlatform>) -> Self {
        Self { store, platform }
    }

    /// Execute `action` for `rule`.
    ///
    /// Returns the written log entry, or the first error among the platform
    /// call, the log insert and the timestamp update.
    pub async fn execute(
        &self,
        action: &Action,
        rule: &AutomationRule,
    ) -> Result<ActionLogEntry, RuleError> {
        let target_id = target_id_for(rule.id);
        tracing::info!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            action = %action.action_type,
            "Executing action"
        );

        let platform_result = self.platform.apply(action, rule, &target_id).await;
        let (status, error_message) = match &platform_result {
            Ok(()) => (ActionStatus::Success, None),
            Err(e) => (ActionStatus::Failed, Some(e.to_string())),
        };

        let now = Utc::now();
        let entry = ActionLogEntry {
            id: Uuid::new_v4(),
            user_id: rule.user_id,
            rule_id: rule.id,
            action_type: action.action_type,
            target_type: action.target,
            target_id,
            details: ActionDetails {
                rule_name: rule.name.clone(),
                action_value: action.value,
                reason: trigger_reason(&rule.name),
            },
            status,
            error_message,
            executed_at: now,
        };

        let log_result = self.store.append_action_log(&entry).await;
        if let Err(e) = &log_result {
            tracing::warn!(
                rule_id = %rule.id,
                action = %action.action_type,
                error = %e,
                "Failed to append action log entry"
            );
        }

        let mark_result = self.store.mark_triggered(rule.id, now).await;
        if let Err(e) = &mark_result {
            tracing::warn!(
                rule_id = %rule.id,
                error = %e,
                "Failed to update last_triggered_at"
            );
        }

        platform_result?;
        log_result?;
        mark_result?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformError, SimulatedPlatform};
    use crate::schema::{
        ActionTarget, ActionType, CompareOp, Condition, MetricName, RuleRow, Timeframe,
    };
    use crate::store::MemoryStore;

    struct RejectingPlatform;

    #[async_trait::async_trait]
    impl AdPlatform for RejectingPlatform {
        async fn apply(
            &self,
            action: &Action,
            _rule: &AutomationRule,
            _target_id: &str,
        ) -> Result<(), PlatformError> {
            Err(PlatformError::Rejected {
                platform: "rejecting".to_string(),
                action: action.action_type.to_string(),
                reason: "budget locked".to_string(),
            })
        }

        fn platform_name(&self) -> &str {
            "rejecting"
        }
    }

    fn rule() -> AutomationRule {
        AutomationRule {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Scale winners".to_string(),
            description: None,
            conditions: vec![Condition {
                metric: MetricName::Roas,
                operator: CompareOp::GreaterThan,
                value: 3.0,
                timeframe: Timeframe::Last3Days,
            }],
            actions: vec![budget_increase()],
            is_active: true,
            last_triggered_at: None,
        }
    }

    fn budget_increase() -> Action {
        Action {
            action_type: ActionType::BudgetIncrease,
            value: Some(15.0),
            target: ActionTarget::AdSet,
        }
    }

    async fn store_with(rule: &AutomationRule) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_rule(RuleRow {
                id: rule.id,
                user_id: rule.user_id,
                rule_name: rule.name.clone(),
                rule_description: None,
                conditions: serde_json::json!([]),
                actions: serde_json::json!([]),
                is_active: true,
                last_triggered_at: None,
            })
            .await;
        store
    }

    #[tokio::test]
    async fn writes_log_entry_and_stamps_rule() {
        let rule = rule();
        let store = store_with(&rule).await;
        let executor = ActionExecutor::new(store.clone(), Arc::new(SimulatedPlatform));

        let entry = executor.execute(&budget_increase(), &rule).await.unwrap();

        assert_eq!(entry.status, ActionStatus::Success);
        assert_eq!(entry.target_id, format!("rule-triggered-{}", rule.id));
        assert_eq!(entry.target_type, ActionTarget::AdSet);
        assert_eq!(entry.details.action_value, Some(15.0));
        assert_eq!(
            entry.details.reason,
            "Automated action triggered by rule: Scale winners"
        );

        let log = store.action_log().await;
        assert_eq!(log, vec![entry.clone()]);
        let stored = store.rule(rule.id).await.unwrap();
        assert_eq!(stored.last_triggered_at, Some(entry.executed_at));
    }

    #[tokio::test]
    async fn log_failure_still_stamps_rule() {
        let rule = rule();
        let store = store_with(&rule).await;
        store.fail_log_writes_for(rule.id).await;
        let executor = ActionExecutor::new(store.clone(), Arc::new(SimulatedPlatform));

        let result = executor.execute(&budget_increase(), &rule).await;

        assert!(matches!(result, Err(RuleError::Store(_))));
        assert!(store.action_log().await.is_empty());
        assert!(store.rule(rule.id).await.unwrap().last_triggered_at.is_some());
    }

    #[tokio::test]
    async fn stamp_failure_keeps_log_entry() {
        let rule = rule();
        let store = store_with(&rule).await;
        store.fail_trigger_updates_for(rule.id).await;
        let executor = ActionExecutor::new(store.clone(), Arc::new(SimulatedPlatform));

        let result = executor.execute(&budget_increase(), &rule).await;

        assert!(matches!(result, Err(RuleError::Store(_))));
        assert_eq!(store.action_log().await.len(), 1);
        assert!(store.rule(rule.id).await.unwrap().last_triggered_at.is_none());
    }

    #[tokio::test]
    async fn platform_rejection_is_logged_as_failed() {
        let rule = rule();
        let store = store_with(&rule).await;
        let executor = ActionExecutor::new(store.clone(), Arc::new(RejectingPlatform));

        let result = executor.execute(&budget_increase(), &rule).await;
        assert!(matches!(result, Err(RuleError::Platform(_))));

        let log = store.action_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, ActionStatus::Failed);
        assert!(log[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("budget locked"));
    }
}
