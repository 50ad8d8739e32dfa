use std::fmt;

pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
pub const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over every byte of `input`.
pub fn fnv1a_32(input: &[u8]) -> u32 {
    input.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Identifies one cache slot. Displays as the 8-digit uppercase hex file name.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct CacheKey(u32);

impl CacheKey {
    /// Case-folds `url` (ASCII) before hashing, so `HTTP://A/x` and
    /// `http://a/x` land in the same slot.
    pub fn from_url(url: &str) -> Self {
        Self(fnv1a_32(url.to_ascii_lowercase().as_bytes()))
    }
}

impl From<u32> for CacheKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{fnv1a_32, CacheKey, FNV_OFFSET_BASIS};

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(fnv1a_32(b""), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a_32(b""), 2166136261);
    }

    #[test]
    fn matches_published_vectors() {
        assert_eq!(fnv1a_32(b"a"), 0xE40C292C);
        assert_eq!(fnv1a_32(b"foobar"), 0xBF9CF968);
    }

    #[test]
    fn deterministic_and_order_sensitive() {
        assert_eq!(fnv1a_32(b"http://a/b"), fnv1a_32(b"http://a/b"));
        assert_ne!(fnv1a_32(b"ab"), fnv1a_32(b"ba"));
    }

    #[test]
    fn key_renders_as_eight_uppercase_hex_digits() {
        assert_eq!(CacheKey::from(0xAB).to_string(), "000000AB");
        assert_eq!(CacheKey::from(0xE40C292C).to_string(), "E40C292C");
    }

    #[test]
    fn key_ignores_ascii_case() {
        assert_eq!(
            CacheKey::from_url("HTTP://Example.test/A.html"),
            CacheKey::from_url("http://example.test/a.html")
        );
    }
}
