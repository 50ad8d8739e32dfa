/// The request actually sent upstream: request line, `Host`, and the body
/// when the client sent one. No other client headers are forwarded.
#[derive(Debug, Clone, Copy)]
pub struct ForwardRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
    pub host: &'a str,
    pub body: Option<&'a [u8]>,
}

impl ForwardRequest<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let head = format!(
            "{} {} {}\r\nHost: {}\r\n\r\n",
            self.method, self.path, self.version, self.host
        );
        let mut out = Vec::with_capacity(head.len() + self.body.map_or(0, <[u8]>::len));
        out.extend_from_slice(head.as_bytes());
        if let Some(body) = self.body {
            out.extend_from_slice(body);
        }
        out
    }
}
