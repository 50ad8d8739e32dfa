use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use porter_config::PorterConfig;
use tokio::{
    net::{TcpListener, TcpSocket},
    sync::Semaphore,
};
use tracing::{error, info};

pub(super) fn log_startup(cfg: &PorterConfig, port: u16) {
    info!(target: "porter::master", "Starting PORTER MASTER");
    info!(
        target: "porter::master",
        listen_host = %cfg.global.listen_host,
        port,
        listen_backlog = cfg.global.listen_backlog,
        max_connections = cfg.global.max_connections,
        cache_expiration_secs = cfg.cache.expiration_secs,
        "Global configuration loaded"
    );
}

/// `None` spawns one worker per connection without limit.
pub(super) fn init_semaphore(max_connections: Option<usize>) -> Option<Arc<Semaphore>> {
    let max_conns = max_connections?;
    info!(
        target: "porter::master",
        max_conns,
        "Global connection semaphore initialized"
    );
    Some(Arc::new(Semaphore::new(max_conns)))
}

pub(super) fn bind_listener(host: &str, port: u16, backlog: u32) -> anyhow::Result<TcpListener> {
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("listen_host '{host}' is not an IP address"))?;
    let addr = SocketAddr::new(ip, port);

    info!(target: "porter::master", listen = %addr, backlog, "Binding listener");

    let bound = (|| {
        let socket = match ip {
            IpAddr::V4(_) => TcpSocket::new_v4()?,
            IpAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(backlog)
    })();

    match bound {
        Ok(listener) => {
            info!(target: "porter::master", listen = %addr, "Bind() successful");
            Ok(listener)
        }
        Err(e) => {
            error!(
                target: "porter::master",
                listen = %addr,
                error = ?e,
                "Failed to bind listener"
            );
            Err(anyhow::Error::new(e).context(format!("cannot bind {addr}")))
        }
    }
}
