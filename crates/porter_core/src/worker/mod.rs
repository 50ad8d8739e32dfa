//! Per-connection handler.
//!
//! Each accepted client gets exactly one request/response exchange:
//! read, parse, gate the method, resolve, check the blocklist, try the
//! cache, forward, relay, store, close. Every failure short-circuits to a
//! single error page.

use std::{
    net::{SocketAddr, SocketAddrV4},
    sync::Arc,
    time::Duration,
};

use porter_cache::{CacheKey, CachePolicy};
use porter_http::{parse_request_line, read_request, send_error, send_payload, ClientStream};
use porter_proxy::{ForwardRequest, Resolve};
use tokio::{io::AsyncWriteExt, time::timeout};
use tracing::{debug, info, instrument, warn};

mod context;
mod error;

pub use context::ProxyContext;
pub use error::ProxyError;

/// How a successful exchange was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Served {
    Cache,
    Upstream,
}

/// Entry point for a "logical worker" that handles a single connection.
#[instrument(
    skip(stream, ctx),
    fields(
        client = %client_addr,
    )
)]
pub async fn handle_connection<R: Resolve>(
    mut stream: Box<dyn ClientStream>,
    client_addr: SocketAddr,
    ctx: Arc<ProxyContext<R>>,
) -> anyhow::Result<()> {
    // Echoed in error pages once the request line has been parsed.
    let mut version: Option<String> = None;

    match serve(&mut *stream, &ctx, &mut version).await {
        Ok(served) => {
            debug!(target: "porter::worker", ?served, "Response sent, closing socket");
        }
        Err(err) => match err.status() {
            Some(status) => {
                warn!(
                    target: "porter::worker",
                    error = %err,
                    status = %status.status_code(),
                    "Request failed"
                );
                let page = send_error(&mut stream, version.as_deref(), status);
                match timeout(ctx.write_timeout, page).await {
                    Ok(res) => res?,
                    Err(_) => warn!(
                        target: "porter::worker",
                        timeout = ?ctx.write_timeout,
                        "Timed out writing error page"
                    ),
                }
            }
            None => {
                warn!(target: "porter::worker", error = %err, "Client went away");
            }
        },
    }

    let _ = stream.shutdown().await;
    Ok(())
}

async fn serve<R: Resolve>(
    stream: &mut dyn ClientStream,
    ctx: &ProxyContext<R>,
    version: &mut Option<String>,
) -> Result<Served, ProxyError> {
    // 1) Receive
    let raw = read_request(stream, ctx.read_limits).await?;
    debug!(target: "porter::worker", bytes = raw.len(), "Server received request");

    // 2) Parse; the version is kept for error pages as soon as it is known
    let line = parse_request_line(&raw)?;
    *version = Some(line.version.clone());
    let req = line.into_request(&raw)?;
    info!(
        target: "porter::worker",
        method = %req.method,
        url = %req.url,
        host = %req.host,
        port = req.port,
        "Parsed request"
    );

    // 3) Only GET is proxied
    if req.method != "GET" {
        return Err(ProxyError::Method(req.method));
    }

    // 4) Resolve
    let ip = ctx.resolver.resolve(&req.host, req.port).await?;
    debug!(target: "porter::worker", host = %req.host, %ip, "Resolved IP address");

    // 5) Blocklist, re-read on every request
    if ctx.blocklist.is_blocked(&req.host, ip).await? {
        return Err(ProxyError::Blocked { host: req.host, ip });
    }

    // 6) Cache lookup; the hit is relayed while the lock is still held
    let cacheable = CachePolicy::is_cacheable(&req.url);
    let key = CacheKey::from_url(&req.url);
    if cacheable {
        let guard = ctx.cache.lock().await;
        if let Some(entry) = guard.lookup(key).await {
            info!(target: "porter::worker", cache_key = %key, "Cached file exists, sending");
            relay(stream, &entry.payload, ctx.write_timeout).await?;
            return Ok(Served::Cache);
        }
    } else {
        debug!(target: "porter::worker", url = %req.url, "Query URL, bypassing cache");
    }

    // 7) Forward
    let fwd = ForwardRequest {
        method: &req.method,
        path: req.path(),
        version: &req.version,
        host: &req.host,
        body: req.body.as_deref(),
    };
    debug!(target: "porter::worker", path = fwd.path, "Requested path");
    let res = ctx
        .forwarder
        .forward(SocketAddrV4::new(ip, req.port), &fwd)
        .await?;

    // 8) Relay
    info!(
        target: "porter::worker",
        bytes = res.bytes.len(),
        "Response received, forwarding to client"
    );
    let relayed = relay(stream, &res.bytes, ctx.write_timeout).await;

    // 9) Store, even if the client has already gone
    if cacheable && res.complete {
        let guard = ctx.cache.lock().await;
        match guard.store(key, &res.bytes).await {
            Ok(()) => debug!(target: "porter::worker", cache_key = %key, "Response cached"),
            Err(e) => warn!(
                target: "porter::worker",
                cache_key = %key,
                error = ?e,
                "Failed to cache response"
            ),
        }
    } else if cacheable {
        debug!(target: "porter::worker", cache_key = %key, "Incomplete response, not caching");
    }

    relayed?;
    Ok(Served::Upstream)
}

/// Writes `payload` verbatim, giving up after `limit`.
async fn relay(
    stream: &mut dyn ClientStream,
    payload: &[u8],
    limit: Duration,
) -> Result<(), ProxyError> {
    match timeout(limit, send_payload(stream, payload)).await {
        Ok(res) => res.map_err(ProxyError::ClientWrite),
        Err(_) => Err(ProxyError::ClientWriteTimeout(limit)),
    }
}
