//! Background batch scheduling.
//!
//! When `AUTOMATION_CRON` is set, a tokio task ticks at a fixed interval and
//! runs one batch pass whenever a scheduled time has passed since the last
//! run. Missed ticks collapse into a single run.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::{debug, error, info};

use adpilot_rules::{BatchOutcome, BatchRunner};

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires `sec min hour day-of-month month day-of-week`.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// A parsed cron schedule plus the time of the last batch it started.
#[derive(Debug, Clone)]
pub struct BatchSchedule {
    expression: String,
    schedule: Schedule,
    last_run: DateTime<Utc>,
}

impl BatchSchedule {
    /// Parse `expr`. Only schedule points after `started_at` are due.
    pub fn parse(expr: &str, started_at: DateTime<Utc>) -> Result<Self, cron::error::Error> {
        let expression = normalize_cron(expr);
        let schedule = Schedule::from_str(&expression)?;
        Ok(Self {
            expression,
            schedule,
            last_run: started_at,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// True if a scheduled time falls in `(last_run, now]`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.schedule
            .after(&self.last_run)
            .next()
            .is_some_and(|next| next <= now)
    }

    pub fn mark_run(&mut self, at: DateTime<Utc>) {
        self.last_run = at;
    }
}

/// Main scheduling loop. Spawned as a tokio task; never returns.
pub async fn run_schedule_loop(runner: BatchRunner, mut schedule: BatchSchedule, tick: Duration) {
    info!(
        cron = schedule.expression(),
        tick_secs = tick.as_secs(),
        "Automation scheduler started"
    );

    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;

        let now = Utc::now();
        if !schedule.is_due(now) {
            debug!("Scheduler tick: batch not due at {}", now);
            continue;
        }
        schedule.mark_run(now);

        match runner.run().await {
            Ok(BatchOutcome::NoActiveRules { .. }) => {
                info!("Scheduled batch: no active rules");
            }
            Ok(BatchOutcome::Completed(summary)) => {
                info!(
                    total = summary.total,
                    successful = summary.successful,
                    failed = summary.failed,
                    "Scheduled batch complete"
                );
            }
            Err(e) => {
                error!(error = %e, "Scheduled batch failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, h, m, s).unwrap()
    }

    #[test]
    fn five_field_cron_gains_seconds() {
        assert_eq!(normalize_cron("*/15 * * * *"), "0 */15 * * * *");
        assert_eq!(normalize_cron(" 0 */15 * * * * "), "0 */15 * * * *");
    }

    #[test]
    fn invalid_cron_is_rejected() {
        assert!(BatchSchedule::parse("not a cron", at(0, 0, 0)).is_err());
    }

    #[test]
    fn due_once_the_next_point_passes() {
        let schedule = BatchSchedule::parse("*/15 * * * *", at(10, 1, 0)).unwrap();
        assert!(!schedule.is_due(at(10, 14, 59)));
        assert!(schedule.is_due(at(10, 15, 0)));
        assert!(schedule.is_due(at(10, 16, 30)));
    }

    #[test]
    fn marking_a_run_waits_for_the_following_point() {
        let mut schedule = BatchSchedule::parse("*/15 * * * *", at(10, 1, 0)).unwrap();
        schedule.mark_run(at(10, 15, 20));
        assert!(!schedule.is_due(at(10, 29, 0)));
        assert!(schedule.is_due(at(10, 30, 5)));
    }

    #[test]
    fn missed_points_collapse_into_one_run() {
        let mut schedule = BatchSchedule::parse("0 * * * *", at(8, 30, 0)).unwrap();
        let late = at(12, 5, 0);
        assert!(schedule.is_due(late));
        schedule.mark_run(late);
        assert!(!schedule.is_due(at(12, 59, 0)));
    }
}
