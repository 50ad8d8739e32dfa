//! Content-addressed disk cache for upstream responses.
//!
//! One file per key, named after the 32-bit FNV-1a hash of the lowercased
//! URL. Freshness comes from the file's mtime; there is no in-memory index.
//! Two URLs with the same hash share a slot, and the later write wins.

mod entry;
mod key;
mod policy;
mod store;

pub use entry::CacheEntry;
pub use key::{fnv1a_32, CacheKey, FNV_OFFSET_BASIS, FNV_PRIME};
pub use policy::CachePolicy;
pub use store::{CacheGuard, CacheStore};
