use bytes::Bytes;
use thiserror::Error;

pub const MAX_METHOD_LEN: usize = 15;
pub const MAX_URL_LEN: usize = 255;
pub const MAX_VERSION_LEN: usize = 15;
pub const MAX_HOST_LEN: usize = 255;

pub const DEFAULT_PORT: u16 = 80;

const HOST_PREFIX: &[u8] = b"Host: ";

/// A client request reduced to what the proxy needs to forward it.
///
/// `url` is ASCII-lowercased; it is only ever used to derive the cache key
/// and the upstream path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub url: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    pub body: Option<Bytes>,
}

impl ParsedRequest {
    /// Path component forwarded upstream (see [`request_path`]).
    pub fn path(&self) -> &str {
        request_path(&self.url)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestParseError {
    #[error("request line is missing the {0}")]
    MissingToken(&'static str),
    #[error("{field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("missing Host header")]
    MissingHost,
    #[error("empty hostname in Host header")]
    EmptyHost,
    #[error("invalid port '{0}' in Host header")]
    InvalidPort(String),
}

/// The first line of a request, parsed before any header is looked at so the
/// version is known even when the rest of the request is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub url: String,
    pub version: String,
}

impl RequestLine {
    /// Completes the request from the same bytes: Host header and body.
    pub fn into_request(self, raw: &[u8]) -> Result<ParsedRequest, RequestParseError> {
        let headers_end = find(raw, b"\r\n\r\n", 0);
        let header_block = &raw[..headers_end.map(|p| p + 2).unwrap_or(raw.len())];

        let (host, port) = host_header(header_block)?;

        let body = headers_end
            .map(|p| p + 4)
            .filter(|start| *start < raw.len())
            .map(|start| Bytes::copy_from_slice(&raw[start..]));

        Ok(ParsedRequest {
            method: self.method,
            url: self.url,
            version: self.version,
            host,
            port,
            body,
        })
    }
}

/// Splits the first line on ASCII whitespace into method, URL and version.
pub fn parse_request_line(raw: &[u8]) -> Result<RequestLine, RequestParseError> {
    let line_end = find(raw, b"\r\n", 0).unwrap_or(raw.len());
    let request_line = String::from_utf8_lossy(&raw[..line_end]);
    let mut parts = request_line.split_ascii_whitespace();

    let method = bounded(parts.next(), "method", MAX_METHOD_LEN)?;
    let url = bounded(parts.next(), "url", MAX_URL_LEN)?.to_ascii_lowercase();
    let version = bounded(parts.next(), "version", MAX_VERSION_LEN)?;

    Ok(RequestLine {
        method,
        url,
        version,
    })
}

/// Parses the bytes read from a client.
///
/// `Host: ` is matched case-sensitively at the start of a header line; the
/// body is whatever follows the blank line that ends the header block.
pub fn parse_request(raw: &[u8]) -> Result<ParsedRequest, RequestParseError> {
    parse_request_line(raw)?.into_request(raw)
}

/// Strips a leading `scheme://`, then keeps everything from the first `/`.
/// A URL without any path maps to `/`.
pub fn request_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}

fn bounded(
    token: Option<&str>,
    field: &'static str,
    max: usize,
) -> Result<String, RequestParseError> {
    let token = token.ok_or(RequestParseError::MissingToken(field))?;
    if token.len() > max {
        return Err(RequestParseError::FieldTooLong {
            field,
            len: token.len(),
            max,
        });
    }
    Ok(token.to_string())
}

fn host_header(header_block: &[u8]) -> Result<(String, u16), RequestParseError> {
    let start = header_lines(header_block)
        .find(|line| line.starts_with(HOST_PREFIX))
        .ok_or(RequestParseError::MissingHost)?;

    let value = String::from_utf8_lossy(&start[HOST_PREFIX.len()..]);
    let value = value.trim_end();

    let (hostname, port) = match value.split_once(':') {
        Some((name, digits)) => {
            let port = digits
                .parse::<u16>()
                .map_err(|_| RequestParseError::InvalidPort(digits.to_string()))?;
            (name, port)
        }
        None => (value, DEFAULT_PORT),
    };

    if hostname.is_empty() {
        return Err(RequestParseError::EmptyHost);
    }
    if hostname.len() > MAX_HOST_LEN {
        return Err(RequestParseError::FieldTooLong {
            field: "host",
            len: hostname.len(),
            max: MAX_HOST_LEN,
        });
    }

    Ok((hostname.to_string(), port))
}

/// Header lines after the request line, without their `\r\n`.
fn header_lines(block: &[u8]) -> impl Iterator<Item = &[u8]> {
    block
        .split(|b| *b == b'\n')
        .skip(1)
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}
