//! Hook dispatch configuration.

use serde::{Deserialize, Serialize};

/// Settings for the hook registry, dispatcher, and tick scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Handlers running longer than this many milliseconds are logged at `warn`.
    #[serde(default = "default_slow_handler_warn_ms")]
    pub slow_handler_warn_ms: u64,
    /// Maximum coroutine resumptions per tick (0 = unlimited).
    #[serde(default)]
    pub coroutine_step_budget: usize,
    /// Whether handlers whose owner was disposed are removed after a dispatch.
    #[serde(default = "default_true")]
    pub prune_dead_handlers: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            slow_handler_warn_ms: default_slow_handler_warn_ms(),
            coroutine_step_budget: 0,
            prune_dead_handlers: true,
        }
    }
}

fn default_slow_handler_warn_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}
