//! Host configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! `config/default`, an environment overlay, and `LABEXT__*` environment
//! variables. Every field has a serde default so an empty source is valid.

pub mod hooks;
pub mod logging;
pub mod modules;

use serde::{Deserialize, Serialize};

pub use self::hooks::HookConfig;
pub use self::logging::LoggingConfig;
pub use self::modules::ModuleConfig;

use crate::error::AppError;

/// Root host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Tick loop settings.
    #[serde(default)]
    pub host: TickConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Hook dispatch settings.
    #[serde(default)]
    pub hooks: HookConfig,
    /// Module loading settings.
    #[serde(default)]
    pub modules: ModuleConfig,
}

/// Tick loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Ticks per second driven by the host loop.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
    /// Number of ticks to run before shutting down (0 = until interrupted).
    #[serde(default)]
    pub run_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate(),
            run_ticks: 0,
        }
    }
}

impl HostConfig {
    /// Load configuration.
    ///
    /// Merges `{dir}/default` with `{dir}/{env}` and environment variables
    /// prefixed with `LABEXT__`. Missing files are skipped.
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LABEXT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

fn default_tick_rate() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_files_uses_defaults() {
        let config = HostConfig::load("does/not/exist", "test").unwrap();
        assert_eq!(config.host.tick_rate_hz, 60);
        assert_eq!(config.hooks.slow_handler_warn_ms, 50);
        assert!(config.hooks.prune_dead_handlers);
        assert!(config.modules.disabled.is_empty());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: HostConfig =
            serde_json::from_value(serde_json::json!({ "hooks": { "coroutine_step_budget": 8 } }))
                .unwrap();
        assert_eq!(config.hooks.coroutine_step_budget, 8);
        assert_eq!(config.hooks.slow_handler_warn_ms, 50);
        assert_eq!(config.logging.level, "info");
    }
}
