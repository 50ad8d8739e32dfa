#![allow(dead_code)]

use std::{
    collections::HashMap,
    future::Future,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use porter_cache::{CacheKey, CacheStore};
use porter_config::HttpConfig;
use porter_core::{ProxyContext, handle_connection};
use porter_filter::Blocklist;
use porter_http::ReadLimits;
use porter_proxy::{Forwarder, Resolve, ResolveError};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

pub const UPSTREAM_REPLY: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";

/// Resolves names from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Ipv4Addr>,
}

impl StaticResolver {
    pub fn with(mut self, host: &str, ip: Ipv4Addr) -> Self {
        self.hosts.insert(host.to_string(), ip);
        self
    }
}

impl Resolve for StaticResolver {
    fn resolve(
        &self,
        host: &str,
        _port: u16,
    ) -> impl Future<Output = Result<Ipv4Addr, ResolveError>> + Send {
        let found = self
            .hosts
            .get(host)
            .copied()
            .ok_or_else(|| ResolveError::NoIpv4 {
                host: host.to_string(),
            });
        async move { found }
    }
}

/// Minimal HTTP upstream that counts requests and remembers what it saw.
pub struct MockUpstream {
    pub port: u16,
    requests: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        Self::start_with_delay(Duration::ZERO).await
    }

    /// Waits `delay` after reading each request before replying.
    pub async fn start_with_delay(delay: Duration) -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));

        let (count, seen) = (requests.clone(), received.clone());
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let (count, seen) = (count.clone(), seen.clone());
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let mut data = Vec::new();
                    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        data.extend_from_slice(&buf[..n]);
                    }
                    if data.is_empty() {
                        return;
                    }
                    count.fetch_add(1, Ordering::SeqCst);
                    seen.lock().unwrap().push(data);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let _ = socket.write_all(UPSTREAM_REPLY).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            port,
            requests,
            received,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Vec<u8>> {
        self.received.lock().unwrap().last().cloned()
    }
}

/// A proxy context over a private cache directory and blocklist file.
pub struct Harness {
    _dir: TempDir,
    pub cache_dir: PathBuf,
    pub blocklist_path: PathBuf,
    pub ctx: Arc<ProxyContext<StaticResolver>>,
}

impl Harness {
    pub async fn new(blocked: &[&str]) -> Self {
        Self::build(Some(blocked), Duration::from_secs(2)).await
    }

    pub async fn without_blocklist() -> Self {
        Self::build(None, Duration::from_secs(2)).await
    }

    /// Client writes give up after `write_timeout`.
    pub async fn with_write_timeout(write_timeout: Duration) -> Self {
        let nothing_blocked: &[&str] = &[];
        Self::build(Some(nothing_blocked), write_timeout).await
    }

    async fn build(blocked: Option<&[&str]>, write_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache_dir = dir.path().join("cache");
        let blocklist_path = dir.path().join("blocklist");

        if let Some(lines) = blocked {
            let mut contents = lines.join("\n");
            contents.push('\n');
            std::fs::write(&blocklist_path, contents).expect("write blocklist");
        }

        let cache = CacheStore::open(&cache_dir, Duration::from_secs(60))
            .await
            .expect("open cache");
        let resolver = StaticResolver::default()
            .with("example.test", Ipv4Addr::LOCALHOST)
            .with("blocked.test", Ipv4Addr::LOCALHOST);
        let limits = ReadLimits {
            timeout: Duration::from_secs(2),
            max_bytes: 64 * 1024,
        };
        let ctx = ProxyContext::new(
            limits,
            write_timeout,
            cache,
            Blocklist::new(&blocklist_path),
            Forwarder::new(&HttpConfig::default()),
            resolver,
        );

        Self {
            _dir: dir,
            cache_dir,
            blocklist_path,
            ctx: Arc::new(ctx),
        }
    }

    /// Runs one connection through the handler and returns every byte the
    /// client received.
    pub async fn send(&self, raw: &[u8]) -> Vec<u8> {
        let (mut client, server) = tokio::io::duplex(256 * 1024);
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let worker = tokio::spawn(handle_connection(Box::new(server), peer, self.ctx.clone()));

        client.write_all(raw).await.unwrap();
        client.shutdown().await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        worker.await.unwrap().expect("handler");
        out
    }

    pub fn cache_file(&self, url: &str) -> PathBuf {
        self.cache_dir.join(CacheKey::from_url(url).to_string())
    }
}

/// `GET {url}` with a Host header pointing at the mock upstream's port.
pub fn get(url: &str, host: &str, port: u16) -> Vec<u8> {
    format!("GET {url} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n").into_bytes()
}

pub fn status_line(response: &[u8]) -> String {
    let text = String::from_utf8_lossy(response);
    text.split("\r\n").next().unwrap_or_default().to_string()
}
