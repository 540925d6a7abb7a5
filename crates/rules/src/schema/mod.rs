//! Typed schema for automation rules, metrics and the action log.
//!
//! Rules arrive from the store as a loosely-typed [`RuleRow`] whose
//! `conditions` and `actions` columns hold JSON. Conversion into an
//! [`AutomationRule`] validates every enum and normalizes the
//! "single object or array" ambiguity into a non-empty `Vec`.

mod action;
mod action_log;
mod condition;
mod metrics;
mod rule;

pub use action::*;
pub use action_log::*;
pub use condition::*;
pub use metrics::*;
pub use rule::*;
