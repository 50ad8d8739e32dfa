use std::sync::Arc;

use porter_config::PorterConfig;
use porter_proxy::{Resolve, SystemResolver};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::worker::ProxyContext;

mod accept;
mod startup;

use accept::accept_loop;
use startup::{bind_listener, init_semaphore, log_startup};

pub struct Master {
    cfg: Arc<PorterConfig>,
    port: u16,
}

impl Master {
    pub fn new(cfg: PorterConfig, port: u16) -> Self {
        Self {
            cfg: Arc::new(cfg),
            port,
        }
    }

    /// Binds the listening socket with `SO_REUSEADDR` and the configured
    /// backlog.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        bind_listener(
            self.cfg.global.listen_host(),
            self.port,
            self.cfg.global.listen_backlog(),
        )
    }

    /// Binds, opens the cache and serves with the system resolver. Only
    /// startup failures return; the accept loop runs forever.
    #[instrument(skip(self), fields(
        port = self.port,
        max_connections = self.cfg.global.max_connections,
        log_level = %self.cfg.global.log_level,
    ))]
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = self.bind().await?;
        let resolver = SystemResolver::new(self.cfg.http.dns_timeout());
        self.serve(listener, resolver).await
    }

    /// Serves on an already bound listener with any resolver.
    pub async fn serve<R: Resolve>(self, listener: TcpListener, resolver: R) -> anyhow::Result<()> {
        let ctx = Arc::new(ProxyContext::from_config(&self.cfg, resolver).await?);
        let semaphore = init_semaphore(self.cfg.global.max_connections());

        log_startup(&self.cfg, self.port);
        info!(
            target: "porter::master",
            cache_dir = %ctx.cache.dir().display(),
            blocklist = %ctx.blocklist.path().display(),
            "Proxy context ready"
        );

        accept_loop(listener, semaphore, ctx).await
    }
}
