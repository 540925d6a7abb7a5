//! End-to-end batch passes against the in-memory store.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use adpilot_rules::platform::SimulatedPlatform;
use adpilot_rules::runner::ReportOutcome;
use adpilot_rules::schema::{ActionStatus, ActionTarget, ActionType, MetricRecord, RuleRow};
use adpilot_rules::store::MemoryStore;
use adpilot_rules::{BatchOutcome, BatchRunner, BatchSummary};

fn high_cpa_rule(user_id: Uuid, is_active: bool) -> RuleRow {
    RuleRow {
        id: Uuid::new_v4(),
        user_id,
        rule_name: "Pause high CPA".to_string(),
        rule_description: None,
        conditions: json!([{"metric": "cpa", "operator": ">", "value": 30, "timeframe": "last_day"}]),
        actions: json!([{"type": "pause", "target": "campaign"}]),
        is_active,
        last_triggered_at: None,
    }
}

fn todays_metrics(user_id: Uuid, spend: f64, conversions: i64) -> MetricRecord {
    MetricRecord {
        user_id,
        date: Utc::now().date_naive(),
        impressions: 5_000,
        clicks: 100,
        spend,
        conversions,
        conversion_value: 0.0,
    }
}

fn runner(store: &Arc<MemoryStore>) -> BatchRunner {
    BatchRunner::new(store.clone(), Arc::new(SimulatedPlatform))
}

async fn completed(runner: &BatchRunner) -> BatchSummary {
    match runner.run().await.unwrap() {
        BatchOutcome::Completed(summary) => summary,
        other => panic!("expected a completed batch, got {other:?}"),
    }
}

// ── Scenario A: cpa 50 > 30 triggers ────────────────────────────

#[tokio::test]
async fn high_cpa_pauses_campaign() {
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();
    let rule = high_cpa_rule(user, true);
    let rule_id = rule.id;
    store.insert_rule(rule).await;
    store.insert_metric(todays_metrics(user, 100.0, 2)).await;

    let summary = completed(&runner(&store)).await;
    assert_eq!(summary.total, 1);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.triggered, 1);

    let log = store.action_log().await;
    assert_eq!(log.len(), 1);
    let entry = &log[0];
    assert_eq!(entry.action_type, ActionType::Pause);
    assert_eq!(entry.target_type, ActionTarget::Campaign);
    assert_eq!(entry.target_id, format!("rule-triggered-{rule_id}"));
    assert_eq!(entry.status, ActionStatus::Success);
    assert_eq!(entry.user_id, user);
    assert_eq!(entry.details.rule_name, "Pause high CPA");
    assert_eq!(entry.details.action_value, None);

    let stored = store.rule(rule_id).await.unwrap();
    assert!(stored.last_triggered_at.is_some());
}

// ── Scenario B: cpa 20 does not trigger ─────────────────────────

#[tokio::test]
async fn acceptable_cpa_leaves_rule_untouched() {
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();
    let rule = high_cpa_rule(user, true);
    let rule_id = rule.id;
    store.insert_rule(rule).await;
    store.insert_metric(todays_metrics(user, 100.0, 5)).await;

    let summary = completed(&runner(&store)).await;
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.not_met, 1);
    assert!(store.action_log().await.is_empty());
    assert!(store.rule(rule_id).await.unwrap().last_triggered_at.is_none());
}

// ── Scenario C: inactive rules are never processed ──────────────

#[tokio::test]
async fn inactive_rule_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();
    store.insert_rule(high_cpa_rule(user, false)).await;
    store.insert_rule(high_cpa_rule(user, true)).await;
    store.insert_metric(todays_metrics(user, 100.0, 5)).await;

    let summary = completed(&runner(&store)).await;
    // Only the active rule is loaded.
    assert_eq!(summary.total, 1);
    assert!(store.action_log().await.is_empty());
}

// ── Scenario D: zero active rules ───────────────────────────────

#[tokio::test]
async fn no_active_rules_processes_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.insert_rule(high_cpa_rule(Uuid::new_v4(), false)).await;

    let outcome = runner(&store).run().await.unwrap();
    assert!(matches!(outcome, BatchOutcome::NoActiveRules { .. }));
}

// ── Scenario E: one failing rule does not block another ─────────

#[tokio::test]
async fn failing_metrics_query_is_isolated() {
    let store = Arc::new(MemoryStore::new());
    let broken_user = Uuid::new_v4();
    let healthy_user = Uuid::new_v4();

    let broken = high_cpa_rule(broken_user, true);
    let broken_id = broken.id;
    let healthy = high_cpa_rule(healthy_user, true);
    let healthy_id = healthy.id;
    store.insert_rule(broken).await;
    store.insert_rule(healthy).await;
    store.insert_metric(todays_metrics(broken_user, 100.0, 2)).await;
    store.insert_metric(todays_metrics(healthy_user, 100.0, 2)).await;
    store.fail_metrics_for(broken_user).await;

    let summary = completed(&runner(&store)).await;
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);

    let log = store.action_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].rule_id, healthy_id);
    assert!(store.rule(broken_id).await.unwrap().last_triggered_at.is_none());

    let broken_report = summary
        .reports
        .iter()
        .find(|r| r.rule_id == broken_id)
        .unwrap();
    assert!(matches!(broken_report.outcome, ReportOutcome::Failed { .. }));
}

// ── No cool-down between passes ─────────────────────────────────

#[tokio::test]
async fn immediate_rerun_repeats_decision() {
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();
    store.insert_rule(high_cpa_rule(user, true)).await;
    store.insert_metric(todays_metrics(user, 100.0, 2)).await;

    let runner = runner(&store);
    let first = completed(&runner).await;
    let second = completed(&runner).await;

    assert_eq!(first.triggered, 1);
    assert_eq!(second.triggered, 1);
    assert_eq!(store.action_log().await.len(), 2);
}

// ── Many rules, bounded concurrency ─────────────────────────────

#[tokio::test]
async fn every_rule_is_settled_under_a_small_permit_pool() {
    let store = Arc::new(MemoryStore::new());
    let mut expected_triggers = 0;
    for i in 0..25 {
        let user = Uuid::new_v4();
        store.insert_rule(high_cpa_rule(user, true)).await;
        // Odd users have cpa 50, even users cpa 10.
        let conversions = if i % 2 == 1 { 2 } else { 10 };
        if i % 2 == 1 {
            expected_triggers += 1;
        }
        store.insert_metric(todays_metrics(user, 100.0, conversions)).await;
    }

    let runner = runner(&store).with_max_concurrency(3);
    let summary = completed(&runner).await;

    assert_eq!(summary.total, 25);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.triggered, expected_triggers);
    assert_eq!(summary.reports.len(), 25);
    assert_eq!(store.action_log().await.len(), expected_triggers);
}

#[tokio::test]
async fn summary_serializes_per_rule_status() {
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();
    store.insert_rule(high_cpa_rule(user, true)).await;
    store.insert_metric(todays_metrics(user, 100.0, 2)).await;

    let summary = completed(&runner(&store)).await;
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["reports"][0]["status"], "triggered");
    assert_eq!(json["reports"][0]["actions"], 1);
    assert_eq!(json["total"], 1);
}
