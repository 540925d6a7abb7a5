//! Batch runner: one settle-all pass over every active rule.
//!
//! Each rule runs as its own task in a [`JoinSet`], gated by a semaphore.
//! A failing, invalid or panicking rule is counted and logged; it never
//! aborts its siblings. Only a failure to load the rule list fails the batch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::RuleError;
use crate::platform::AdPlatform;
use crate::processor::{RuleOutcome, RuleProcessor};
use crate::schema::AutomationRule;
use crate::store::AutomationStore;

/// Default upper bound on concurrently processed rules.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Per-rule line of a batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct RuleReport {
    pub rule_id: Uuid,
    pub rule_name: String,
    #[serde(flatten)]
    pub outcome: ReportOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportOutcome {
    Completed(RuleOutcome),
    Failed { status: &'static str, error: String },
}

impl ReportOutcome {
    fn failed(error: &RuleError) -> Self {
        ReportOutcome::Failed {
            status: "failed",
            error: error.to_string(),
        }
    }
}

/// Aggregate result of one batch pass.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub triggered: usize,
    pub not_met: usize,
    pub skipped: usize,
    pub timestamp: DateTime<Utc>,
    pub reports: Vec<RuleReport>,
}

impl BatchSummary {
    fn new(total: usize) -> Self {
        Self {
            total,
            successful: 0,
            failed: 0,
            triggered: 0,
            not_met: 0,
            skipped: 0,
            timestamp: Utc::now(),
            reports: Vec::with_capacity(total),
        }
    }

    fn record(
        &mut self,
        rule_id: Uuid,
        rule_name: String,
        result: Result<RuleOutcome, RuleError>,
    ) {
        let outcome = match result {
            Ok(outcome) => {
                self.successful += 1;
                match outcome {
                    RuleOutcome::Skipped => self.skipped += 1,
                    RuleOutcome::NotMet => self.not_met += 1,
                    RuleOutcome::Triggered { .. } => self.triggered += 1,
                }
                ReportOutcome::Completed(outcome)
            }
            Err(e) => {
                self.failed += 1;
                tracing::warn!(
                    rule_id = %rule_id,
                    rule_name = %rule_name,
                    error = %e,
                    "Rule processing failed"
                );
                ReportOutcome::failed(&e)
            }
        };
        self.reports.push(RuleReport {
            rule_id,
            rule_name,
            outcome,
        });
    }
}

/// Result of [`BatchRunner::run`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// No rule has `is_active = true`; nothing was processed.
    NoActiveRules { timestamp: DateTime<Utc> },
    Completed(BatchSummary),
}

/// Loads active rules and processes each one independently.
///
/// Owns its store handle; construct once per process and reuse across runs.
#[derive(Clone)]
pub struct BatchRunner {
    store: Arc<dyn AutomationStore>,
    processor: RuleProcessor,
    max_concurrency: usize,
}

impl BatchRunner {
    pub fn new(store: Arc<dyn AutomationStore>, platform: Arc<dyn AdPlatform>) -> Self {
        Self {
            processor: RuleProcessor::new(store.clone(), platform),
            store,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Cap the number of rules processed at the same time (minimum 1).
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Run one batch pass.
    ///
    /// Fails only when the active-rule query itself fails.
    pub async fn run(&self) -> Result<BatchOutcome, RuleError> {
        tracing::info!("Starting automation rule processing");

        let rows = self.store.active_rules().await?;
        if rows.is_empty() {
            tracing::info!("No active rules found");
            return Ok(BatchOutcome::NoActiveRules {
                timestamp: Utc::now(),
            });
        }

        tracing::info!(rules = rows.len(), "Found active rules to process");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut task_rules: HashMap<tokio::task::Id, (Uuid, String)> = HashMap::new();
        let mut summary = BatchSummary::new(rows.len());

        for row in rows {
            let rule_id = row.id;
            let rule_name = row.rule_name.clone();
            let processor = self.processor.clone();
            let semaphore = semaphore.clone();

            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = semaphore.acquire_owned().await.ok();
                let rule = AutomationRule::try_from(row)?;
                processor.process(&rule).await
            });
            task_rules.insert(handle.id(), (rule_id, rule_name));
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (task_id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_err) => {
                    let id = join_err.id();
                    (id, Err(RuleError::TaskAborted(join_err.to_string())))
                }
            };
            let (rule_id, rule_name) = task_rules
                .remove(&task_id)
                .unwrap_or_else(|| (Uuid::nil(), String::new()));
            summary.record(rule_id, rule_name, result);
        }

        summary.timestamp = Utc::now();
        tracing::info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            triggered = summary.triggered,
            not_met = summary.not_met,
            skipped = summary.skipped,
            "Processing complete"
        );

        Ok(BatchOutcome::Completed(summary))
    }
}
