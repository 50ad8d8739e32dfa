use anyhow::Context;
use clap::{error::ErrorKind, Parser};
use porter_config::PorterConfig;
use porter_core::Master;
use tracing::warn;
use utils::init_tracing;

mod cli;

use cli::{apply_expiration, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            eprintln!("usage: porter <port> <expiration_seconds> [--config <file>]");
            std::process::exit(1);
        }
    };

    let config_path = cli.config_path();
    let cfg = PorterConfig::from_file(&config_path)
        .with_context(|| format!("cannot load {}", config_path.display()))?;
    let cfg = apply_expiration(cfg, &cli);

    init_tracing(Some(cfg.global.log_level()));

    let report = cfg.validate();
    for warning in report.warnings() {
        warn!(target: "porter::master", "{warning}");
    }
    if report.has_errors() {
        anyhow::bail!("invalid configuration:\n{}", report.error_summary());
    }
    cfg.print();

    Master::new(cfg, cli.port).run().await
}
