//! Condition evaluation against aggregated metrics.
//!
//! A condition derives one metric value from the window totals and compares
//! it with the threshold. Ratios with a zero denominator evaluate to 0.
//! A window without rows never satisfies a condition, whatever the operator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::aggregate::{MetricAggregator, MetricTotals};
use crate::schema::{Condition, MetricName};
use crate::store::StoreError;

/// Derive a named metric from window totals.
pub fn metric_value(metric: MetricName, totals: &MetricTotals) -> f64 {
    match metric {
        MetricName::Cpa => {
            if totals.conversions > 0 {
                totals.spend / totals.conversions as f64
            } else {
                0.0
            }
        }
        MetricName::Roas => {
            if totals.spend > 0.0 {
                totals.conversion_value / totals.spend
            } else {
                0.0
            }
        }
        MetricName::Ctr => {
            if totals.impressions > 0 {
                totals.clicks as f64 / totals.impressions as f64 * 100.0
            } else {
                0.0
            }
        }
        MetricName::Spend => totals.spend,
        MetricName::Conversions => totals.conversions as f64,
    }
}

/// Evaluates single conditions for a user.
#[derive(Clone)]
pub struct ConditionEvaluator {
    aggregator: MetricAggregator,
}

impl ConditionEvaluator {
    pub fn new(aggregator: MetricAggregator) -> Self {
        Self { aggregator }
    }

    /// Pure check of `condition` against totals; `None` (no data) is `false`.
    pub fn check(condition: &Condition, totals: Option<&MetricTotals>) -> bool {
        let Some(totals) = totals else {
            return false;
        };
        let value = metric_value(condition.metric, totals);
        condition.operator.check(value, condition.value)
    }

    /// Fetch the condition's window for `user_id` and evaluate it.
    ///
    /// Store errors are returned to the caller, which decides how the rule
    /// is reported.
    pub async fn evaluate(
        &self,
        condition: &Condition,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let totals = self
            .aggregator
            .totals(user_id, condition.timeframe, now)
            .await?;

        let met = Self::check(condition, totals.as_ref());

        tracing::debug!(
            user_id = %user_id,
            metric = %condition.metric,
            operator = %condition.operator,
            threshold = condition.value,
            timeframe = %condition.timeframe,
            value = ?totals.as_ref().map(|t| metric_value(condition.metric, t)),
            met,
            "Condition evaluated"
        );

        Ok(met)
    }
}
