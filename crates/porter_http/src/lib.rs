//! Client-facing HTTP/1.x plumbing: reading a request off the socket,
//! parsing it, and writing either a fixed error page or relayed bytes back.

pub mod read;
pub mod request;
pub mod responses;

use tokio::io::{AsyncRead, AsyncWrite};

/// Anything a worker can serve: a `TcpStream` in production, an in-memory
/// duplex pipe in tests.
pub trait ClientStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ClientStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub use read::{read_request, ReadError, ReadLimits};
pub use request::{
    parse_request, parse_request_line, request_path, ParsedRequest, RequestLine, RequestParseError,
};
pub use responses::{send_error, send_payload, send_response, ErrorStatus};
