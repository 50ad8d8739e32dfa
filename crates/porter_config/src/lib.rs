//! Configuration models for the porter proxy.
//!
//! `PorterConfig` is loaded from an optional INI file, zero/empty values are
//! replaced with defaults, and `validate` reports anything that would make the
//! proxy misbehave at runtime.

mod cache;
mod filter;
mod global;
mod http;
mod porter;
mod validation;

pub use cache::{CacheConfig, DEFAULT_EXPIRATION_SECS};
pub use filter::FilterConfig;
pub use global::GlobalConfig;
pub use http::HttpConfig;
pub use porter::PorterConfig;
pub use validation::{validate, ConfigReport};
