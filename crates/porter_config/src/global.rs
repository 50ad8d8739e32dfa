use serde::Deserialize;

// =======================================================
// GLOBAL CONFIG + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Address the listener binds to; the port comes from the command line.
    pub listen_host: String,
    /// Pending-connection queue length passed to `listen(2)`.
    pub listen_backlog: u32,
    /// Admission limit for concurrent workers; 0 means unbounded.
    pub max_connections: usize,
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".into(),
            listen_backlog: 5,
            max_connections: 0,
            log_level: "info".into(),
        }
    }
}

impl GlobalConfig {
    pub fn listen_host(&self) -> &str {
        &self.listen_host
    }

    pub fn listen_backlog(&self) -> u32 {
        self.listen_backlog
    }

    /// `None` when workers are spawned without an admission limit.
    pub fn max_connections(&self) -> Option<usize> {
        (self.max_connections > 0).then_some(self.max_connections)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub(crate) fn apply_defaults_from(&mut self, defaults: &GlobalConfig) {
        if self.listen_host.trim().is_empty() {
            self.listen_host = defaults.listen_host.clone();
        }
        if self.listen_backlog == 0 {
            self.listen_backlog = defaults.listen_backlog;
        }
        if self.log_level.trim().is_empty() {
            self.log_level = defaults.log_level.clone();
        }
    }
}
