use std::{net::Ipv4Addr, time::Duration};

use porter_filter::BlocklistError;
use porter_http::{ErrorStatus, ReadError, RequestParseError};
use porter_proxy::{ForwardError, ResolveError};
use thiserror::Error;

/// Why a request ended without relaying an upstream response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("could not read request: {0}")]
    Receive(#[from] ReadError),
    #[error("malformed request: {0}")]
    Parse(#[from] RequestParseError),
    #[error("method {0} is not supported")]
    Method(String),
    #[error("cannot resolve upstream: {0}")]
    Resolve(#[from] ResolveError),
    #[error("{host} ({ip}) is on the blocklist")]
    Blocked { host: String, ip: Ipv4Addr },
    #[error(transparent)]
    Blocklist(#[from] BlocklistError),
    #[error("upstream exchange failed: {0}")]
    Forward(#[from] ForwardError),
    #[error("writing to client failed: {0}")]
    ClientWrite(#[source] std::io::Error),
    #[error("client did not accept the response within {0:?}")]
    ClientWriteTimeout(Duration),
}

impl ProxyError {
    /// Error page to send, or `None` when the client can no longer be
    /// written to.
    pub fn status(&self) -> Option<ErrorStatus> {
        match self {
            ProxyError::Receive(_) | ProxyError::Parse(_) | ProxyError::Method(_) => {
                Some(ErrorStatus::BadRequest)
            }
            ProxyError::Resolve(_) => Some(ErrorStatus::NotFound),
            ProxyError::Blocked { .. } => Some(ErrorStatus::Forbidden),
            ProxyError::Blocklist(_) | ProxyError::Forward(_) => Some(ErrorStatus::InternalError),
            ProxyError::ClientWrite(_) | ProxyError::ClientWriteTimeout(_) => None,
        }
    }
}
