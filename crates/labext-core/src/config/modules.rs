//! Module loading configuration.

use serde::{Deserialize, Serialize};

/// Module loading settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module IDs that must not be loaded.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl ModuleConfig {
    /// Returns whether the module with `id` is disabled.
    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.iter().any(|disabled| disabled == id)
    }
}
