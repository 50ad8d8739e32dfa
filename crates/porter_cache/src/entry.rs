use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::CacheKey;

/// A cached upstream response, exactly as it was received.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Bytes,
    /// Last write time of the backing file.
    pub modified: SystemTime,
}

/// Fresh iff `now - modified < expiration`.
pub(crate) fn is_fresh(modified: SystemTime, now: SystemTime, expiration: Duration) -> bool {
    now.duration_since(modified).unwrap_or(Duration::ZERO) < expiration
}
