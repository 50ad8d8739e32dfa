use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Version used when the client's own could not be parsed.
pub const FALLBACK_VERSION: &str = "HTTP/1.1";

const HTML: &str = "text/html";

/// Statuses the proxy synthesizes itself. Successful responses are never
/// built here; upstream bytes are relayed as they arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    BadRequest,
    NotFound,
    Forbidden,
    InternalError,
}

impl ErrorStatus {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorStatus::BadRequest => StatusCode::BAD_REQUEST,
            ErrorStatus::NotFound => StatusCode::NOT_FOUND,
            ErrorStatus::Forbidden => StatusCode::FORBIDDEN,
            ErrorStatus::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `"403 Forbidden"` and friends.
    pub fn status_text(self) -> String {
        let code = self.status_code();
        format!("{} {}", code.as_u16(), code.canonical_reason().unwrap_or(""))
    }

    pub fn body(self) -> &'static str {
        match self {
            ErrorStatus::BadRequest => {
                "<!DOCTYPE html><html><body><h1>400 Bad Request</h1></body></html>"
            }
            ErrorStatus::NotFound => {
                "<!DOCTYPE html><html><body><h1>404 Not Found</h1></body></html>"
            }
            ErrorStatus::Forbidden => {
                "<!DOCTYPE html><html><body><h1>403 Forbidden</h1></body></html>"
            }
            ErrorStatus::InternalError => {
                "<!DOCTYPE html><html><body><h1>500 Internal Server Error</h1></body></html>"
            }
        }
    }
}

/// Writes a status line, `Content-Type`, `Content-Length` and the body.
pub async fn send_response<W>(
    stream: &mut W,
    version: &str,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let head = format!(
        "{version} {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         \r\n",
        body.len()
    );

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await
}

/// Sends the fixed HTML page for `status`.
pub async fn send_error<W>(
    stream: &mut W,
    version: Option<&str>,
    status: ErrorStatus,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    send_response(
        stream,
        version.unwrap_or(FALLBACK_VERSION),
        &status.status_text(),
        HTML,
        status.body().as_bytes(),
    )
    .await
}

/// Relays a cached or freshly fetched upstream response byte-for-byte.
pub async fn send_payload<W>(stream: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(payload).await?;
    stream.flush().await
}
