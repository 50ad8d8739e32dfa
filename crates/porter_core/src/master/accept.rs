use std::{net::SocketAddr, sync::Arc};

use porter_proxy::Resolve;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::worker::{handle_connection, ProxyContext};

struct AcceptedConn {
    stream: TcpStream,
    addr: SocketAddr,
    permit: Option<OwnedSemaphorePermit>,
}

async fn accept_with_permit(
    listener: &TcpListener,
    semaphore: Option<&Arc<Semaphore>>,
) -> anyhow::Result<AcceptedConn> {
    let (stream, addr) = listener.accept().await?;

    let permit = match semaphore {
        Some(sem) => {
            let permit = sem.clone().acquire_owned().await?;
            debug!(
                target: "porter::master",
                client_addr = %addr,
                available_permits = sem.available_permits(),
                "Connection permit acquired"
            );
            Some(permit)
        }
        None => None,
    };

    Ok(AcceptedConn {
        stream,
        addr,
        permit,
    })
}

/// Accepts forever. A failed accept is logged and the loop goes on.
#[instrument(skip(listener, semaphore, ctx))]
pub(super) async fn accept_loop<R: Resolve>(
    listener: TcpListener,
    semaphore: Option<Arc<Semaphore>>,
    ctx: Arc<ProxyContext<R>>,
) -> anyhow::Result<()> {
    let local = listener.local_addr()?;
    info!(target: "porter::master", listen = %local, "Listening on port {}", local.port());

    loop {
        let AcceptedConn { stream, addr, permit } =
            match accept_with_permit(&listener, semaphore.as_ref()).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(target: "porter::master", error = ?e, "Failed to accept connection");
                    continue;
                }
            };

        info!(target: "porter::master", client_addr = %addr, "Connected to client");

        let ctx = ctx.clone();
        let span = tracing::info_span!("worker_connection", client_addr = %addr);

        tokio::spawn(
            async move {
                let _permit = permit;
                debug!(target: "porter::worker", "Worker spawned for incoming connection");

                if let Err(e) = handle_connection(Box::new(stream), addr, ctx).await {
                    error!(
                        target: "porter::worker",
                        client_addr = %addr,
                        error = ?e,
                        "Error while handling connection"
                    );
                } else {
                    debug!(
                        target: "porter::worker",
                        client_addr = %addr,
                        "Connection handled successfully"
                    );
                }
            }
            .instrument(span),
        );
    }
}
