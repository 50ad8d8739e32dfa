use std::{
    future::Future,
    net::{IpAddr, Ipv4Addr},
};

use tokio::{
    net::lookup_host,
    time::{timeout, Duration},
};
use tracing::debug;

use crate::ResolveError;

/// Name resolution seam. Workers only ever connect over IPv4, so
/// implementations return the first IPv4 address for `host`.
pub trait Resolve: Send + Sync + 'static {
    fn resolve(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Ipv4Addr, ResolveError>> + Send;
}

/// Resolves through the operating system's resolver.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Resolve for SystemResolver {
    fn resolve(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Ipv4Addr, ResolveError>> + Send {
        let host = host.to_string();
        let limit = self.timeout;
        async move {
            if let Ok(ip) = host.parse::<Ipv4Addr>() {
                return Ok(ip);
            }

            // Collect into owned addresses so nothing borrows `host` below.
            let lookup = timeout(limit, lookup_host((host.as_str(), port)))
                .await
                .map(|res| {
                    res.map(|addrs| {
                        addrs
                            .filter_map(|addr| match addr.ip() {
                                IpAddr::V4(v4) => Some(v4),
                                IpAddr::V6(_) => None,
                            })
                            .collect::<Vec<_>>()
                    })
                });

            let ips = match lookup {
                Ok(Ok(ips)) => ips,
                Ok(Err(source)) => return Err(ResolveError::Lookup { host, source }),
                Err(_) => {
                    return Err(ResolveError::Timeout {
                        host,
                        timeout: limit,
                    })
                }
            };

            let ip = ips
                .first()
                .copied()
                .ok_or_else(|| ResolveError::NoIpv4 { host: host.clone() })?;

            debug!(target: "porter::proxy", %host, %ip, "Resolved upstream address");
            Ok(ip)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use tokio::time::Duration;

    use super::{Resolve, SystemResolver};
    use crate::ResolveError;

    #[tokio::test]
    async fn literal_ipv4_skips_lookup() {
        let resolver = SystemResolver::new(Duration::from_secs(1));
        let ip = resolver.resolve("192.0.2.7", 80).await.expect("literal");
        assert_eq!(ip, Ipv4Addr::new(192, 0, 2, 7));
    }

    #[tokio::test]
    async fn localhost_resolves_to_loopback() {
        let resolver = SystemResolver::new(Duration::from_secs(5));
        let ip = resolver.resolve("localhost", 80).await.expect("localhost");
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn failed_lookup_names_the_host() {
        let resolver = SystemResolver::new(Duration::from_secs(2));
        let err = resolver
            .resolve("no-such-host.invalid", 80)
            .await
            .unwrap_err();
        match err {
            ResolveError::Lookup { host, .. }
            | ResolveError::Timeout { host, .. }
            | ResolveError::NoIpv4 { host } => assert_eq!(host, "no-such-host.invalid"),
        }
    }
}
