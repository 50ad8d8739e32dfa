use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info,porter=debug,porter_proxy=debug,porter_cache=debug";

/// Installs the global subscriber. `RUST_LOG` wins over `fallback_level`,
/// which in turn wins over the built-in default.
pub fn init_tracing(fallback_level: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        fallback_level
            .filter(|lvl| !lvl.trim().is_empty())
            .and_then(|lvl| EnvFilter::try_new(lvl).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();
}
