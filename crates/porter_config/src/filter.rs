use std::path::Path;

use serde::Deserialize;

// =======================================================
// FILTER CONFIG + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Flat text file, one blocked hostname or IPv4 address per line.
    pub blocklist_path: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blocklist_path: "blocklist".into(),
        }
    }
}

impl FilterConfig {
    pub fn blocklist_path(&self) -> &Path {
        Path::new(&self.blocklist_path)
    }

    pub(crate) fn apply_defaults_from(&mut self, defaults: &FilterConfig) {
        if self.blocklist_path.trim().is_empty() {
            self.blocklist_path = defaults.blocklist_path.clone();
        }
    }
}
