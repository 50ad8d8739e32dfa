use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::ForwardError;

const MAX_RESPONSE_HEADERS: usize = 64;

/// Raw upstream response bytes, headers and body, untouched.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub bytes: Bytes,
    /// False when reading stopped early: the size ceiling was hit, the
    /// upstream stalled, or it closed before the announced body arrived.
    /// Incomplete responses are still relayed but must not be cached.
    pub complete: bool,
}

/// How the end of the body is recognised once the head is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length(usize),
    /// Not decoded, only walked: the read ends after the zero-size chunk
    /// and its trailer section.
    Chunked,
    NoBody,
    UntilClose,
}

/// Reads one response until its framing says it is done, the peer closes,
/// or `max_bytes` is reached.
///
/// The read timeout applies per read. A stall before any byte arrives is an
/// error; a stall afterwards yields what was received, marked incomplete.
pub(crate) async fn read_response<S>(
    stream: &mut S,
    read_timeout: Duration,
    max_bytes: usize,
) -> Result<UpstreamResponse, ForwardError>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = BytesMut::with_capacity(8192);
    let mut head: Option<(usize, Framing)> = None;
    let mut tmp = [0u8; 8192];

    loop {
        if let Some((head_len, framing)) = head {
            if let Some(end) = body_end(&buf, head_len, framing) {
                buf.truncate(end);
                return Ok(finished(buf, true));
            }
        }

        let n = match timeout(read_timeout, stream.read(&mut tmp)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                if buf.is_empty() {
                    return Err(ForwardError::Read(e));
                }
                warn!(target: "porter::proxy", error = ?e, received = buf.len(), "Upstream read failed mid-response");
                return Ok(finished(buf, false));
            }
            Err(_) => {
                if buf.is_empty() {
                    return Err(ForwardError::ReadTimeout(read_timeout));
                }
                warn!(target: "porter::proxy", received = buf.len(), "Upstream stalled mid-response");
                return Ok(finished(buf, false));
            }
        };

        if n == 0 {
            if buf.is_empty() {
                return Err(ForwardError::Empty);
            }
            let complete = matches!(head, Some((_, Framing::UntilClose)));
            if !complete {
                debug!(target: "porter::proxy", received = buf.len(), "Upstream closed before end of framed body");
            }
            return Ok(finished(buf, complete));
        }

        let room = max_bytes.saturating_sub(buf.len());
        if n > room {
            buf.extend_from_slice(&tmp[..room]);
            warn!(target: "porter::proxy", max_bytes, "Upstream response truncated at size ceiling");
            return Ok(finished(buf, false));
        }
        buf.extend_from_slice(&tmp[..n]);

        if head.is_none() {
            head = parse_head(&buf);
        }
    }
}

fn finished(buf: BytesMut, complete: bool) -> UpstreamResponse {
    UpstreamResponse {
        bytes: buf.freeze(),
        complete,
    }
}

/// Byte offset where the response ends, if it has fully arrived.
fn body_end(buf: &[u8], head_len: usize, framing: Framing) -> Option<usize> {
    match framing {
        Framing::NoBody => Some(head_len),
        Framing::Length(len) => {
            let end = head_len.saturating_add(len);
            (buf.len() >= end).then_some(end)
        }
        Framing::Chunked => chunked_end(buf, head_len),
        Framing::UntilClose => None,
    }
}

/// Follows chunk-size lines from `pos`. `None` until the last chunk and the
/// blank line closing its trailers are in `buf`, or when a size line is not
/// valid hex; such a response only ends at close and is never complete.
fn chunked_end(buf: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let line_end = find_crlf(buf, pos)?;
        let size_str = std::str::from_utf8(&buf[pos..line_end])
            .ok()?
            .split(';')
            .next()
            .unwrap_or("")
            .trim();
        let chunk_size = usize::from_str_radix(size_str, 16).ok()?;
        pos = line_end + 2;

        if chunk_size == 0 {
            loop {
                let trailer_end = find_crlf(buf, pos)?;
                let blank = trailer_end == pos;
                pos = trailer_end + 2;
                if blank {
                    return Some(pos);
                }
            }
        }

        // chunk data plus its CRLF
        pos = pos.checked_add(chunk_size)?.checked_add(2)?;
        if pos > buf.len() {
            return None;
        }
    }
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

fn parse_head(buf: &[u8]) -> Option<(usize, Framing)> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut res = httparse::Response::new(&mut headers);

    let head_len = match res.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return None,
        Err(e) => {
            // Not something we can frame; relay whatever arrives until close.
            debug!(target: "porter::proxy", error = ?e, "Unparsable upstream response head");
            let end = buf.windows(4).position(|w| w == b"\r\n\r\n")?;
            return Some((end + 4, Framing::UntilClose));
        }
    };

    let code = res.code.unwrap_or(200);
    if (100..200).contains(&code) || code == 204 || code == 304 {
        return Some((head_len, Framing::NoBody));
    }

    let mut framing = Framing::UntilClose;
    for header in res.headers.iter() {
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            let value = String::from_utf8_lossy(header.value).to_ascii_lowercase();
            if value.contains("chunked") {
                framing = Framing::Chunked;
                break;
            }
        } else if header.name.eq_ignore_ascii_case("content-length") {
            if let Some(len) = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
            {
                framing = Framing::Length(len);
            }
        }
    }

    debug!(target: "porter::proxy", status = code, head_len, framing = ?framing, "Parsed upstream response head");
    Some((head_len, framing))
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;
    use tokio::time::Duration;

    use super::{chunked_end, parse_head, read_response, Framing};
    use crate::ForwardError;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn parse_head_detects_framing() {
        let head = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(parse_head(head), Some((head.len(), Framing::Length(5))));

        let head = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip, chunked\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(parse_head(head), Some((head.len(), Framing::Chunked)));

        let head = b"HTTP/1.1 304 Not Modified\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(parse_head(head), Some((head.len(), Framing::NoBody)));

        let head = b"HTTP/1.0 200 OK\r\n\r\n";
        assert_eq!(parse_head(head), Some((head.len(), Framing::UntilClose)));

        assert_eq!(parse_head(b"HTTP/1.1 200 OK\r\nContent-"), None);
    }

    #[tokio::test]
    async fn content_length_response_spanning_segments() {
        let (mut upstream, mut proxy) = tokio::io::duplex(64);
        tokio::spawn(async move {
            upstream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhello")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            upstream.write_all(b"world").await.unwrap();
            // keep-alive upstream: never closes on its own
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let res = read_response(&mut proxy, TIMEOUT, 1 << 20).await.expect("response");
        assert!(res.complete);
        assert!(res.bytes.ends_with(b"\r\n\r\nhelloworld"));
    }

    #[tokio::test]
    async fn until_close_response_is_complete_at_eof() {
        let (mut upstream, mut proxy) = tokio::io::duplex(1024);
        upstream
            .write_all(b"HTTP/1.0 200 OK\r\n\r\nbody without length")
            .await
            .unwrap();
        drop(upstream);

        let res = read_response(&mut proxy, TIMEOUT, 1 << 20).await.expect("response");
        assert!(res.complete);
        assert_eq!(&res.bytes[..], b"HTTP/1.0 200 OK\r\n\r\nbody without length");
    }

    #[tokio::test]
    async fn chunked_response_ends_at_terminator() {
        let (mut upstream, mut proxy) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            upstream
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let res = read_response(&mut proxy, TIMEOUT, 1 << 20).await.expect("response");
        assert!(res.complete);
        assert!(res.bytes.ends_with(b"5\r\nhello\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn size_line_ending_in_zero_is_not_the_terminator() {
        let (mut upstream, mut proxy) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            upstream
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n10\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            upstream
                .write_all(b"abcdefghijklmn\r\n0\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let res = read_response(&mut proxy, TIMEOUT, 1 << 20).await.expect("response");
        assert!(res.complete);
        assert!(res.bytes.ends_with(b"10\r\n\r\nabcdefghijklmn\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn chunk_extensions_and_trailers_end_the_read() {
        let (mut upstream, mut proxy) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            upstream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5;ext=1\r\nhello\r\n0;x\r\nX-Trailer: y\r\n\r\n",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        // well under the 2s read timeout if the terminator is recognised
        let res = tokio::time::timeout(
            Duration::from_millis(500),
            read_response(&mut proxy, TIMEOUT, 1 << 20),
        )
        .await
        .expect("finished before read timeout")
        .expect("response");
        assert!(res.complete);
        assert!(res.bytes.ends_with(b"X-Trailer: y\r\n\r\n"));
    }

    #[test]
    fn chunk_walk_needs_the_whole_body() {
        let body = b"10\r\n\r\n0\r\n\r\n";
        assert_eq!(chunked_end(body, 0), None);
        assert_eq!(chunked_end(b"3\r\nabc\r\n0\r\n", 0), None);
        assert_eq!(chunked_end(b"3\r\nabc\r\n0\r\n\r\n", 0), Some(13));
        assert_eq!(chunked_end(b"zz\r\nabc\r\n0\r\n\r\n", 0), None);
    }

    #[tokio::test]
    async fn oversized_response_is_truncated_and_incomplete() {
        let (mut upstream, mut proxy) = tokio::io::duplex(4096);
        upstream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n")
            .await
            .unwrap();
        upstream.write_all(&[b'x'; 1000]).await.unwrap();
        drop(upstream);

        let res = read_response(&mut proxy, TIMEOUT, 100).await.expect("response");
        assert!(!res.complete);
        assert_eq!(res.bytes.len(), 100);
    }

    #[tokio::test]
    async fn short_body_before_close_is_incomplete() {
        let (mut upstream, mut proxy) = tokio::io::duplex(1024);
        upstream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhel")
            .await
            .unwrap();
        drop(upstream);

        let res = read_response(&mut proxy, TIMEOUT, 1 << 20).await.expect("response");
        assert!(!res.complete);
    }

    #[tokio::test]
    async fn silent_upstream_times_out() {
        let (_upstream, mut proxy) = tokio::io::duplex(64);
        let err = read_response(&mut proxy, Duration::from_millis(50), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::ReadTimeout(_)));
    }

    #[tokio::test]
    async fn immediate_close_is_empty() {
        let (upstream, mut proxy) = tokio::io::duplex(64);
        drop(upstream);
        let err = read_response(&mut proxy, TIMEOUT, 1024).await.unwrap_err();
        assert!(matches!(err, ForwardError::Empty));
    }
}
