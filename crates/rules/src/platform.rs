//! Ad platform seam for executing actions.
//!
//! No real ad network is called. [`SimulatedPlatform`] records the intended
//! change in the logs and always succeeds.

use crate::schema::{Action, AutomationRule};

/// Errors reported by an ad platform when applying an action.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{platform} rejected {action}: {reason}")]
    Rejected {
        platform: String,
        action: String,
        reason: String,
    },
}

/// Trait for ad platform integrations.
#[async_trait::async_trait]
pub trait AdPlatform: Send + Sync {
    /// Apply one action for a triggered rule to `target_id`.
    async fn apply(
        &self,
        action: &Action,
        rule: &AutomationRule,
        target_id: &str,
    ) -> Result<(), PlatformError>;

    /// Human-readable name for this platform (e.g., "simulated").
    fn platform_name(&self) -> &str;
}

/// Logs the action instead of sending it anywhere.
#[derive(Debug, Default, Clone)]
pub struct SimulatedPlatform;

#[async_trait::async_trait]
impl AdPlatform for SimulatedPlatform {
    async fn apply(
        &self,
        action: &Action,
        rule: &AutomationRule,
        target_id: &str,
    ) -> Result<(), PlatformError> {
        tracing::info!(
            platform = self.platform_name(),
            rule_id = %rule.id,
            rule_name = %rule.name,
            action = %action.action_type,
            target_type = %action.target,
            target_id,
            value = ?action.value,
            "Action executed"
        );
        Ok(())
    }

    fn platform_name(&self) -> &str {
        "simulated"
    }
}
