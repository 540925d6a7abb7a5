//! Per-rule orchestration: evaluate every condition, then fire every action.
//!
//! ```text
//! Skipped (inactive)
//! Evaluating ──► NotMet ──────────────► Done
//!            └─► AllMet ─► Executing ─► Done
//! ```
//!
//! Conditions are all started before any is awaited and are never
//! short-circuited. A condition whose metric query fails counts as not met:
//! no action fires and the rule is reported as failed.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;

use crate::aggregate::MetricAggregator;
use crate::error::RuleError;
use crate::evaluator::ConditionEvaluator;
use crate::executor::ActionExecutor;
use crate::platform::AdPlatform;
use crate::schema::AutomationRule;
use crate::store::AutomationStore;

/// Terminal state of one rule for one batch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// Rule is inactive.
    Skipped,
    /// At least one condition did not hold.
    NotMet,
    /// All conditions held and every action executed.
    Triggered { actions: usize },
}

#[derive(Clone)]
pub struct RuleProcessor {
    evaluator: ConditionEvaluator,
    executor: ActionExecutor,
}

impl RuleProcessor {
    pub fn new(store: Arc<dyn AutomationStore>, platform: Arc<dyn AdPlatform>) -> Self {
        Self {
            evaluator: ConditionEvaluator::new(MetricAggregator::new(store.clone())),
            executor: ActionExecutor::new(store, platform),
        }
    }

    /// Run one rule through evaluation and, if every condition holds, execution.
    pub async fn process(&self, rule: &AutomationRule) -> Result<RuleOutcome, RuleError> {
        tracing::debug!(rule_id = %rule.id, rule_name = %rule.name, "Processing rule");

        if !rule.is_active {
            tracing::info!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                "Rule is inactive, skipping"
            );
            return Ok(RuleOutcome::Skipped);
        }

        let now = Utc::now();
        let results = join_all(
            rule.conditions
                .iter()
                .map(|condition| self.evaluator.evaluate(condition, rule.user_id, now)),
        )
        .await;

        let total = results.len();
        let mut all_met = true;
        let mut errors = Vec::new();
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(met) => all_met &= met,
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        condition = i,
                        error = %e,
                        "Metric query failed, treating condition as not met"
                    );
                    all_met = false;
                    errors.push(e);
                }
            }
        }

        if let Some(first) = errors.first() {
            return Err(RuleError::ConditionQuery {
                failed: errors.len(),
                total,
                first: first.to_string(),
            });
        }

        if !all_met {
            tracing::info!(rule_id = %rule.id, rule_name = %rule.name, "Conditions not met");
            return Ok(RuleOutcome::NotMet);
        }

        tracing::info!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            actions = rule.actions.len(),
            "All conditions met, executing actions"
        );

        let results = join_all(
            rule.actions
                .iter()
                .map(|action| self.executor.execute(action, rule)),
        )
        .await;

        let total = results.len();
        let failures: Vec<RuleError> = results.into_iter().filter_map(|r| r.err()).collect();
        if let Some(first) = failures.first() {
            return Err(RuleError::ActionsFailed {
                failed: failures.len(),
                total,
                first: first.to_string(),
            });
        }

        Ok(RuleOutcome::Triggered { actions: total })
    }
}
