pub struct CachePolicy;

impl CachePolicy {
    /// Only parameter-free URLs are cached. Query URLs skip both the lookup
    /// and the store, so they are always fetched from upstream.
    pub fn is_cacheable(url: &str) -> bool {
        !url.contains('?')
    }
}

#[cfg(test)]
mod tests {
    use super::CachePolicy;

    #[test]
    fn query_urls_are_not_cacheable() {
        assert!(CachePolicy::is_cacheable("http://a/b.html"));
        assert!(!CachePolicy::is_cacheable("http://a/b?x=1"));
        assert!(!CachePolicy::is_cacheable("http://a/?"));
    }
}
