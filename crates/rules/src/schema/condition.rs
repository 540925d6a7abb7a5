//! Condition types: metric, comparison operator and lookback timeframe.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Absolute difference below which `=` treats two values as equal.
pub const EQUALITY_TOLERANCE: f64 = 0.01;

/// Slack absorbing f64 rounding, so `0.03 = 0.02` stays false.
const ROUNDING_SLACK: f64 = 1e-9;

/// A single metric/operator/threshold/timeframe comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: MetricName,
    pub operator: CompareOp,
    pub value: f64,
    pub timeframe: Timeframe,
}

/// Metrics a condition can be evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    /// Cost per acquisition: spend / conversions.
    Cpa,
    /// Return on ad spend: conversion value / spend.
    Roas,
    /// Click-through rate in percent: clicks / impressions * 100.
    Ctr,
    Spend,
    Conversions,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricName::Cpa => write!(f, "cpa"),
            MetricName::Roas => write!(f, "roas"),
            MetricName::Ctr => write!(f, "ctr"),
            MetricName::Spend => write!(f, "spend"),
            MetricName::Conversions => write!(f, "conversions"),
        }
    }
}

/// Comparison operators, stored in their symbolic form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = "=")]
    Equal,
}

impl CompareOp {
    /// Compare `value` against `threshold`.
    ///
    /// Ordering operators are exact. `Equal` holds when the difference is
    /// below [`EQUALITY_TOLERANCE`]; a difference of exactly the tolerance,
    /// even after rounding, is not equal.
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::GreaterThan => value > threshold,
            CompareOp::LessThan => value < threshold,
            CompareOp::GreaterEqual => value >= threshold,
            CompareOp::LessEqual => value <= threshold,
            CompareOp::Equal => {
                let diff = (value - threshold).abs();
                diff < EQUALITY_TOLERANCE - ROUNDING_SLACK
            }
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::GreaterThan => write!(f, ">"),
            CompareOp::LessThan => write!(f, "<"),
            CompareOp::GreaterEqual => write!(f, ">="),
            CompareOp::LessEqual => write!(f, "<="),
            CompareOp::Equal => write!(f, "="),
        }
    }
}

/// Rolling lookback window anchored at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "last_day")]
    LastDay,
    #[serde(rename = "last_3_days")]
    Last3Days,
    #[serde(rename = "last_7_days")]
    Last7Days,
}

impl Timeframe {
    /// Window length in days.
    pub fn days(&self) -> i64 {
        match self {
            Timeframe::LastDay => 1,
            Timeframe::Last3Days => 3,
            Timeframe::Last7Days => 7,
        }
    }

    /// First day included in the window: `now - days`, truncated to the date.
    pub fn window_start(&self, now: DateTime<Utc>) -> NaiveDate {
        (now - Duration::days(self.days())).date_naive()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::LastDay => write!(f, "last_day"),
            Timeframe::Last3Days => write!(f, "last_3_days"),
            Timeframe::Last7Days => write!(f, "last_7_days"),
        }
    }
}
