use std::{net::IpAddr, path::Path};

use crate::PorterConfig;

/// Findings from [`validate`]. Errors stop startup; warnings are logged and
/// the proxy starts anyway.
#[derive(Debug, Default)]
pub struct ConfigReport {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl ConfigReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// One indented `- problem` line per error.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("  - {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Validate a porter configuration and return a report of issues.
pub fn validate(cfg: &PorterConfig) -> ConfigReport {
    let mut report = ConfigReport::default();

    validate_global(cfg, &mut report);
    validate_cache(cfg, &mut report);
    validate_filter(cfg, &mut report);

    report
}

fn validate_global(cfg: &PorterConfig, report: &mut ConfigReport) {
    let host = cfg.global.listen_host.trim();
    if host.parse::<IpAddr>().is_err() {
        report.error(format!(
            "global.listen_host '{host}' is not an IP address"
        ));
    }
}

fn validate_cache(cfg: &PorterConfig, report: &mut ConfigReport) {
    let cache_path = Path::new(&cfg.cache.dir);
    if cache_path.exists() {
        if !cache_path.is_dir() {
            report.error(format!(
                "cache.dir '{}' exists but is not a directory",
                cfg.cache.dir
            ));
        }
    } else {
        report.warn(format!(
            "cache.dir '{}' does not exist; it will be created at startup",
            cfg.cache.dir
        ));
    }
}

fn validate_filter(cfg: &PorterConfig, report: &mut ConfigReport) {
    let path = Path::new(&cfg.filter.blocklist_path);
    if !path.is_file() {
        report.warn(format!(
            "filter.blocklist_path '{}' not found; every request will fail with 500 until it exists",
            cfg.filter.blocklist_path
        ));
    }
}
