use std::time::Duration;

use porter_cache::CacheStore;
use porter_config::PorterConfig;
use porter_filter::Blocklist;
use porter_http::ReadLimits;
use porter_proxy::{Forwarder, Resolve, SystemResolver};

/// State shared by every worker. Only the cache lock is contended; the
/// blocklist is re-read independently by each request.
pub struct ProxyContext<R = SystemResolver> {
    pub read_limits: ReadLimits,
    /// Per write to the client. A cache hit is written while the cache lock
    /// is held, so this also bounds how long one client can hold it.
    pub write_timeout: Duration,
    pub cache: CacheStore,
    pub blocklist: Blocklist,
    pub forwarder: Forwarder,
    pub resolver: R,
}

impl<R: Resolve> ProxyContext<R> {
    pub fn new(
        read_limits: ReadLimits,
        write_timeout: Duration,
        cache: CacheStore,
        blocklist: Blocklist,
        forwarder: Forwarder,
        resolver: R,
    ) -> Self {
        Self {
            read_limits,
            write_timeout,
            cache,
            blocklist,
            forwarder,
            resolver,
        }
    }

    /// Opens (and creates if needed) the cache directory.
    pub async fn from_config(cfg: &PorterConfig, resolver: R) -> anyhow::Result<Self> {
        let cache = CacheStore::open(cfg.cache.dir(), cfg.cache.expiration())
            .await
            .map_err(|e| anyhow::anyhow!("cannot open cache dir '{}': {e}", cfg.cache.dir))?;

        let read_limits = ReadLimits {
            timeout: cfg.http.client_read_timeout(),
            max_bytes: cfg.http.max_request_bytes(),
        };

        Ok(Self::new(
            read_limits,
            cfg.http.client_write_timeout(),
            cache,
            Blocklist::new(cfg.filter.blocklist_path()),
            Forwarder::new(&cfg.http),
            resolver,
        ))
    }
}
