use std::path::Path;

use serde::Deserialize;

use crate::validation::{validate, ConfigReport};
use crate::{CacheConfig, FilterConfig, GlobalConfig, HttpConfig};

// =======================================================
// PORTER CONFIG: main config
// =======================================================
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PorterConfig {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

impl PorterConfig {
    /// Loads `path` if it exists; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        let name = path.to_string_lossy();
        let built = config::Config::builder()
            .add_source(config::File::new(&name, config::FileFormat::Ini).required(false))
            .build()?;

        let mut cfg: PorterConfig = built.try_deserialize()?;

        cfg.apply_defaults();
        Ok(cfg)
    }

    /// Command-line expiration wins over the file. Zero keeps the default.
    pub fn with_expiration_secs(mut self, secs: u64) -> Self {
        if secs > 0 {
            self.cache.expiration_secs = secs;
        }
        self
    }

    /// Validate the configuration and return a report of warnings and errors.
    pub fn validate(&self) -> ConfigReport {
        validate(self)
    }

    fn apply_defaults(&mut self) {
        self.global.apply_defaults_from(&GlobalConfig::default());
        self.http.apply_defaults_from(&HttpConfig::default());
        self.cache.apply_defaults_from(&CacheConfig::default());
        self.filter.apply_defaults_from(&FilterConfig::default());
    }

    pub fn print(&self) {
        println!("================ PORTER CONFIG ================");
        self.print_global();
        self.print_http();
        self.print_cache();
        println!("===============================================");
    }

    fn print_global(&self) {
        println!("\n[global]");
        println!("  listen_host          = {}", self.global.listen_host);
        println!("  listen_backlog       = {}", self.global.listen_backlog);
        println!("  max_connections      = {}", self.global.max_connections);
        println!("  log_level            = {}", self.global.log_level);
    }

    fn print_http(&self) {
        println!("\n[http]");
        println!(
            "  client_read_timeout_secs   = {}",
            self.http.client_read_timeout_secs
        );
        println!(
            "  client_write_timeout_secs  = {}",
            self.http.client_write_timeout_secs
        );
        println!("  dns_timeout_secs           = {}", self.http.dns_timeout_secs);
        println!(
            "  proxy_connect_timeout_secs = {}",
            self.http.proxy_connect_timeout_secs
        );
        println!(
            "  proxy_write_timeout_secs   = {}",
            self.http.proxy_write_timeout_secs
        );
        println!(
            "  proxy_read_timeout_secs    = {}",
            self.http.proxy_read_timeout_secs
        );
        println!("  max_request_bytes          = {}", self.http.max_request_bytes);
        println!(
            "  max_upstream_response_bytes = {}",
            self.http.max_upstream_response_bytes
        );
    }

    fn print_cache(&self) {
        println!("\n[cache]");
        println!("  dir                  = {}", self.cache.dir);
        println!("  expiration_secs      = {}", self.cache.expiration_secs);
        println!("\n[filter]");
        println!("  blocklist_path       = {}", self.filter.blocklist_path);
    }
}
