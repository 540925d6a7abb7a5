//! Rolling-window metric aggregation per user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::schema::{MetricRecord, Timeframe};
use crate::store::{AutomationStore, StoreError};

/// Summed counters over a lookback window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricTotals {
    pub spend: f64,
    pub conversions: i64,
    pub clicks: i64,
    pub impressions: i64,
    pub conversion_value: f64,
    /// Number of metric rows that contributed.
    pub records: usize,
}

impl MetricTotals {
    /// Sum a set of rows. Returns `None` when there are no rows, so that
    /// "no data" is never confused with "all zeros".
    pub fn from_records<'a, I>(records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MetricRecord>,
    {
        let totals = records
            .into_iter()
            .fold(MetricTotals::default(), |mut acc, m| {
                acc.spend += m.spend;
                acc.conversions += m.conversions;
                acc.clicks += m.clicks;
                acc.impressions += m.impressions;
                acc.conversion_value += m.conversion_value;
                acc.records += 1;
                acc
            });

        (totals.records > 0).then_some(totals)
    }
}

/// Reads metric rows from the store and reduces them into [`MetricTotals`].
#[derive(Clone)]
pub struct MetricAggregator {
    store: Arc<dyn AutomationStore>,
}

impl MetricAggregator {
    pub fn new(store: Arc<dyn AutomationStore>) -> Self {
        Self { store }
    }

    /// Totals for `user_id` over `timeframe`, ending at `now`.
    ///
    /// `Ok(None)` means the window holds no rows.
    pub async fn totals(
        &self,
        user_id: Uuid,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<Option<MetricTotals>, StoreError> {
        let since = timeframe.window_start(now);
        let records = self.store.metrics_since(user_id, since).await?;
        let totals = MetricTotals::from_records(&records);

        if totals.is_none() {
            tracing::debug!(
                user_id = %user_id,
                timeframe = %timeframe,
                since = %since,
                "No metrics found in timeframe"
            );
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn record(user_id: Uuid, date: NaiveDate, spend: f64, conversions: i64) -> MetricRecord {
        MetricRecord {
            user_id,
            date,
            impressions: 1000,
            clicks: 20,
            spend,
            conversions,
            conversion_value: spend * 2.0,
        }
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(MetricTotals::from_records(&Vec::new()), None);
    }

    #[test]
    fn sums_every_counter() {
        let user = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let rows = vec![record(user, day, 40.0, 1), record(user, day, 60.0, 3)];

        let totals = MetricTotals::from_records(&rows).unwrap();
        assert_eq!(totals.spend, 100.0);
        assert_eq!(totals.conversions, 4);
        assert_eq!(totals.clicks, 40);
        assert_eq!(totals.impressions, 2000);
        assert_eq!(totals.conversion_value, 200.0);
        assert_eq!(totals.records, 2);
    }

    #[tokio::test]
    async fn window_includes_start_day_and_excludes_older_rows() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let today = now.date_naive();

        store.insert_metric(record(user, today, 10.0, 1)).await;
        // Window start for last_3_days is 2025-06-07, inclusive.
        store.insert_metric(record(user, today - Duration::days(3), 20.0, 1)).await;
        store.insert_metric(record(user, today - Duration::days(4), 400.0, 1)).await;
        store.insert_metric(record(other, today, 999.0, 9)).await;

        let aggregator = MetricAggregator::new(store);
        let totals = aggregator
            .totals(user, Timeframe::Last3Days, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(totals.spend, 30.0);
        assert_eq!(totals.records, 2);
    }

    #[tokio::test]
    async fn no_rows_in_window_is_none() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        store
            .insert_metric(record(user, now.date_naive() - Duration::days(30), 10.0, 1))
            .await;

        let aggregator = MetricAggregator::new(store);
        let totals = aggregator.totals(user, Timeframe::Last7Days, now).await.unwrap();
        assert!(totals.is_none());
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store.fail_metrics_for(user).await;

        let aggregator = MetricAggregator::new(store);
        let result = aggregator.totals(user, Timeframe::LastDay, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::Query(_))));
    }
}
