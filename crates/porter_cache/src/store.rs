use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use tokio::{
    fs,
    io::AsyncWriteExt,
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, warn};

use crate::{entry::is_fresh, CacheEntry, CacheKey};

/// Disk-backed response cache guarded by one process-wide lock.
///
/// Every read and every write goes through a [`CacheGuard`], so at most one
/// of them touches the directory at a time. There is no per-key locking: two
/// workers missing on the same key both fetch upstream and both write, and
/// the second write wins.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    expiration: Duration,
    lock: Mutex<()>,
}

/// Exclusive access to the cache directory for as long as it is alive.
pub struct CacheGuard<'a> {
    store: &'a CacheStore,
    _held: MutexGuard<'a, ()>,
}

impl CacheStore {
    /// Creates the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, expiration: Duration) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!(
            target: "porter::cache",
            dir = %dir.display(),
            expiration_secs = expiration.as_secs(),
            "Cache directory ready"
        );
        Ok(Self {
            dir,
            expiration,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// File backing `key`, whether or not it exists.
    pub fn path_for(&self, key: CacheKey) -> PathBuf {
        self.dir.join(key.to_string())
    }

    /// Waits for the global cache lock.
    pub async fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            store: self,
            _held: self.lock.lock().await,
        }
    }

    /// Locks, looks up, unlocks.
    pub async fn lookup(&self, key: CacheKey) -> Option<CacheEntry> {
        self.lock().await.lookup(key).await
    }

    /// Locks, stores, unlocks.
    pub async fn store(&self, key: CacheKey, payload: &[u8]) -> io::Result<()> {
        self.lock().await.store(key, payload).await
    }
}

impl CacheGuard<'_> {
    pub async fn lookup(&self, key: CacheKey) -> Option<CacheEntry> {
        self.lookup_at(key, SystemTime::now()).await
    }

    /// Returns the entry if it is fresh at `now`. An expired entry is deleted
    /// before returning `None`.
    pub async fn lookup_at(&self, key: CacheKey, now: SystemTime) -> Option<CacheEntry> {
        let path = self.store.path_for(key);

        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(target: "porter::cache", cache_key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(target: "porter::cache", cache_key = %key, error = ?e, "Cannot stat cache file");
                return None;
            }
        };

        let modified = match metadata.modified() {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "porter::cache", cache_key = %key, error = ?e, "Cache file has no mtime");
                return None;
            }
        };

        if !is_fresh(modified, now, self.store.expiration) {
            debug!(target: "porter::cache", cache_key = %key, "Cached file has expired");
            if let Err(e) = fs::remove_file(&path).await {
                warn!(target: "porter::cache", cache_key = %key, error = ?e, "Failed to remove expired cache file");
            }
            return None;
        }

        match fs::read(&path).await {
            Ok(data) => {
                debug!(target: "porter::cache", cache_key = %key, bytes = data.len(), "Cache hit");
                Some(CacheEntry {
                    key,
                    payload: Bytes::from(data),
                    modified,
                })
            }
            Err(e) => {
                warn!(target: "porter::cache", cache_key = %key, error = ?e, "Failed to read cache file");
                None
            }
        }
    }

    /// Overwrites the file for `key` with `payload`. A failed write leaves no
    /// file behind.
    pub async fn store(&self, key: CacheKey, payload: &[u8]) -> io::Result<()> {
        let path = self.store.path_for(key);

        let written = async {
            let mut file = fs::File::create(&path).await?;
            file.write_all(payload).await?;
            file.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                debug!(target: "porter::cache", cache_key = %key, bytes = payload.len(), "Response cached");
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                Err(e)
            }
        }
    }
}
