use std::{path::Path, time::Duration};

use serde::Deserialize;

/// Expiration used when none (or zero) is configured.
pub const DEFAULT_EXPIRATION_SECS: u64 = 60;

// =======================================================
// CACHE CONFIG + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one file per cache key.
    pub dir: String,
    /// Entries older than this are treated as absent and removed.
    pub expiration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "cache".into(),
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }
}

impl CacheConfig {
    pub fn dir(&self) -> &Path {
        Path::new(&self.dir)
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    pub(crate) fn apply_defaults_from(&mut self, defaults: &CacheConfig) {
        if self.dir.trim().is_empty() {
            self.dir = defaults.dir.clone();
        }
        if self.expiration_secs == 0 {
            self.expiration_secs = defaults.expiration_secs;
        }
    }
}
