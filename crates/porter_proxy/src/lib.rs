//! Upstream side of the proxy: resolve the origin, open one connection,
//! send a minimal request, read the whole response, close.

use std::net::SocketAddrV4;

use porter_config::HttpConfig;
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    time::{timeout, Duration},
};
use tracing::{debug, info, instrument};

mod error;
mod request;
mod resolve;
mod response;

pub use error::{ForwardError, ResolveError};
pub use request::ForwardRequest;
pub use resolve::{Resolve, SystemResolver};
pub use response::UpstreamResponse;

/// Timeouts and the response size ceiling for upstream exchanges.
#[derive(Debug, Clone)]
pub struct Forwarder {
    connect_timeout: Duration,
    write_timeout: Duration,
    read_timeout: Duration,
    max_response_bytes: usize,
}

impl Forwarder {
    pub fn new(http: &HttpConfig) -> Self {
        Self {
            connect_timeout: http.proxy_connect_timeout(),
            write_timeout: http.proxy_write_timeout(),
            read_timeout: http.proxy_read_timeout(),
            max_response_bytes: http.max_upstream_response_bytes(),
        }
    }

    /// One request, one response, one connection. The connection is closed
    /// when this returns, whatever the outcome.
    #[instrument(
        skip(self, req),
        fields(upstream = %addr, method = %req.method, path = %req.path)
    )]
    pub async fn forward(
        &self,
        addr: SocketAddrV4,
        req: &ForwardRequest<'_>,
    ) -> Result<UpstreamResponse, ForwardError> {
        let mut stream = connect_with_timeout(addr, self.connect_timeout).await?;

        info!(
            target: "porter::proxy",
            host = %req.host,
            "Connection established, sending request"
        );

        match timeout(self.write_timeout, stream.write_all(&req.encode())).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => return Err(ForwardError::Write { addr, source }),
            Err(_) => return Err(ForwardError::WriteTimeout { addr }),
        }

        let res =
            response::read_response(&mut stream, self.read_timeout, self.max_response_bytes)
                .await?;

        debug!(
            target: "porter::proxy",
            bytes = res.bytes.len(),
            complete = res.complete,
            "Upstream response received"
        );

        let _ = stream.shutdown().await;
        Ok(res)
    }
}

async fn connect_with_timeout(
    addr: SocketAddrV4,
    timeout_dur: Duration,
) -> Result<TcpStream, ForwardError> {
    match timeout(timeout_dur, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(ForwardError::Connect { addr, source }),
        Err(_) => Err(ForwardError::ConnectTimeout {
            addr,
            timeout: timeout_dur,
        }),
    }
}
