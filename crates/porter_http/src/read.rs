use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout, Duration};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    /// Applied to every individual read, not to the request as a whole.
    pub timeout: Duration,
    pub max_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("client closed the connection before sending a request")]
    Closed,
    #[error("client read timed out after {0:?}")]
    Timeout(Duration),
    #[error("request exceeds {0} bytes")]
    TooLarge(usize),
    #[error("client read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads one request: headers up to the blank line, then a `Content-Length`
/// body if one is announced.
///
/// A peer that closes early still yields whatever it sent; only an empty
/// read is reported as [`ReadError::Closed`].
pub async fn read_request<S>(stream: &mut S, limits: ReadLimits) -> Result<BytesMut, ReadError>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = BytesMut::with_capacity(4096);

    let headers_end = loop {
        if let Some(pos) = find_headers_end(&buf) {
            break pos;
        }
        if read_more(stream, &mut buf, limits).await? == 0 {
            if buf.is_empty() {
                return Err(ReadError::Closed);
            }
            debug!(
                target: "porter::http",
                received = buf.len(),
                "Client closed before end of headers"
            );
            return Ok(buf);
        }
    };

    let body_start = headers_end + 4;
    let content_length = content_length(&buf[..headers_end]);
    let wanted = body_start.saturating_add(content_length);
    if wanted > limits.max_bytes {
        return Err(ReadError::TooLarge(limits.max_bytes));
    }

    while buf.len() < wanted {
        if read_more(stream, &mut buf, limits).await? == 0 {
            debug!(
                target: "porter::http",
                expected = content_length,
                received = buf.len() - body_start,
                "Client closed before end of body"
            );
            break;
        }
    }
    buf.truncate(wanted);

    Ok(buf)
}

async fn read_more<S>(
    stream: &mut S,
    buf: &mut BytesMut,
    limits: ReadLimits,
) -> Result<usize, ReadError>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut tmp = [0u8; 4096];
    let n = match timeout(limits.timeout, stream.read(&mut tmp)).await {
        Ok(res) => res?,
        Err(_) => return Err(ReadError::Timeout(limits.timeout)),
    };
    if buf.len() + n > limits.max_bytes {
        return Err(ReadError::TooLarge(limits.max_bytes));
    }
    buf.extend_from_slice(&tmp[..n]);
    Ok(n)
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Missing or unparsable values count as no body.
fn content_length(headers: &[u8]) -> usize {
    String::from_utf8_lossy(headers)
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0)
}
