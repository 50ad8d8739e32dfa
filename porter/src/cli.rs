use std::path::PathBuf;

use clap::Parser;
use porter_config::PorterConfig;

const DEFAULT_CONFIG_PATH: &str = "porter.conf";

#[derive(Debug, Clone, Parser)]
#[command(name = "porter", version, about = "Caching forward HTTP proxy")]
pub struct Cli {
    /// Port to listen on.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Seconds a cached response stays fresh. Non-numeric or 0 keeps the
    /// configured value (60 unless `[cache] expiration_secs` says otherwise).
    pub expiration_seconds: String,

    /// Path to the configuration file (defaults to ./porter.conf if present).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// `None` when the argument is unusable and the configured value stands.
    pub fn expiration_override(&self) -> Option<u64> {
        parse_expiration(&self.expiration_seconds)
    }
}

/// Leading decimal digits after optional whitespace and sign, like `atoi`.
/// Anything that does not yield a positive number is `None`.
pub fn parse_expiration(arg: &str) -> Option<u64> {
    let trimmed = arg.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d - b'0')));

    (!negative && value > 0).then_some(value)
}

/// The command line wins over `[cache] expiration_secs` when it carries a
/// usable number.
pub fn apply_expiration(cfg: PorterConfig, cli: &Cli) -> PorterConfig {
    match cli.expiration_override() {
        Some(secs) => cfg.with_expiration_secs(secs),
        None => cfg,
    }
}
