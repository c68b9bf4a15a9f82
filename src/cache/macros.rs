/// Returns the cached value for a key, or computes, stores and returns it.
///
/// A failed cache read is logged and treated as a miss; only errors from
/// `$block` propagate. The store happens in the background.
///
/// # Example
/// ```rust,ignore
/// let candidates: Vec<Candidate> = cached!(cache, key, ttl, async {
///     retrieve_for_query(&index, provider, &query, k).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %$key, "Cache hit");
                Ok(cached)
            }
            result => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, key = %$key, "Cache read failed, computing value");
                }
                match $block.await {
                    Ok(value) => {
                        $cache.set_in_background(&$key, &value, $ttl);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }};
}
