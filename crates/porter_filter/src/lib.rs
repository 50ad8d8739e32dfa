//! Host/IP blocklist backed by a flat text file.
//!
//! The file is re-read on every query, so edits take effect on the next
//! request without a reload.

use std::{
    net::Ipv4Addr,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::{debug, info};

#[derive(Debug, Error)]
#[error("cannot read blocklist {}: {source}", .path.display())]
pub struct BlocklistError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Clone)]
pub struct Blocklist {
    path: PathBuf,
}

impl Blocklist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a line equals `hostname` or the dotted-quad form of
    /// `resolved_ip`. Only the trailing newline (and a `\r` before it) is
    /// stripped; matching is exact and case-sensitive.
    pub async fn is_blocked(
        &self,
        hostname: &str,
        resolved_ip: Ipv4Addr,
    ) -> Result<bool, BlocklistError> {
        let file = File::open(&self.path).await.map_err(|source| self.error(source))?;
        let mut lines = BufReader::new(file).lines();
        let ip = resolved_ip.to_string();

        while let Some(line) = lines.next_line().await.map_err(|source| self.error(source))? {
            let entry = line.strip_suffix('\r').unwrap_or(&line);
            if entry == hostname || entry == ip {
                info!(
                    target: "porter::filter",
                    %hostname,
                    ip = %ip,
                    entry,
                    "Request matches blocklist"
                );
                return Ok(true);
            }
        }

        debug!(target: "porter::filter", %hostname, ip = %ip, "Not blocked");
        Ok(false)
    }

    fn error(&self, source: std::io::Error) -> BlocklistError {
        BlocklistError {
            path: self.path.clone(),
            source,
        }
    }
}
