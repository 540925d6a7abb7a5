use std::sync::Arc;

use adpilot_core::config::AutomationConfig;
use adpilot_rules::platform::AdPlatform;
use adpilot_rules::{AutomationStore, BatchRunner};

/// Shared handler state.
pub struct AppState {
    /// Batch runner, or the reason no store could be opened.
    runner: Result<BatchRunner, String>,
}

impl AppState {
    pub fn new(
        store: Result<Arc<dyn AutomationStore>, String>,
        platform: Arc<dyn AdPlatform>,
        automation: &AutomationConfig,
    ) -> Self {
        let runner = store.map(|store| {
            BatchRunner::new(store, platform).with_max_concurrency(automation.max_concurrency)
        });
        Self { runner }
    }

    pub fn runner(&self) -> Result<&BatchRunner, &str> {
        self.runner.as_ref().map_err(String::as_str)
    }

    pub fn database_ready(&self) -> bool {
        self.runner.is_ok()
    }
}
