use std::net::SocketAddrV4;

use thiserror::Error;
use tokio::time::Duration;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup of {host} failed: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("lookup of {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },
    #[error("{host} has no IPv4 address")]
    NoIpv4 { host: String },
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddrV4, timeout: Duration },
    #[error("sending request to {addr} failed: {source}")]
    Write {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },
    #[error("sending request to {addr} timed out")]
    WriteTimeout { addr: SocketAddrV4 },
    #[error("reading response failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("upstream sent nothing within {0:?}")]
    ReadTimeout(Duration),
    #[error("upstream closed the connection without a response")]
    Empty,
}
