//! Automation rule evaluation engine for advertising metrics.
//!
//! This crate provides:
//! - Typed rule schema with boundary validation of stored JSON payloads
//! - Rolling-window metric aggregation per user
//! - Condition evaluation (CPA, ROAS, CTR, spend, conversions)
//! - Action execution with an append-only action log
//! - A settle-all batch runner over every active rule

pub mod aggregate;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod platform;
pub mod processor;
pub mod runner;
pub mod schema;
pub mod store;

pub use error::{Result, RuleError};
pub use runner::{BatchOutcome, BatchRunner, BatchSummary};
pub use store::{AutomationStore, StoreError};
