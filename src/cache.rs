/// Ranked stories keyed by request fingerprint.
///
/// Entries expire `ttl` after they were written and are evicted by moka's own
/// housekeeping. Concurrent misses on one key share a single initialization
/// through `try_get_with`. Values are `Arc`s so a reader always gets the whole
/// sequence that was published.
pub(crate) type StoriesCache = moka::future::Cache<String, crate::stories::Stories>;

/// One entry per distinct `n`, so `max_stories` bounds the number of keys.
pub(crate) fn stories_cache(settings: &crate::config::Aggregator) -> StoriesCache {
    moka::future::Cache::builder()
        .max_capacity(u64::try_from(settings.max_stories).unwrap_or(u64::MAX))
        .time_to_live(settings.cache_ttl)
        .build()
}
