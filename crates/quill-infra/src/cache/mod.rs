//! Cache implementations - Redis and in-memory fallback.

mod memory;
#[cfg(feature = "redis")]
mod redis_cache;

pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use redis_cache::{RedisCache, RedisConfig};

/// Match `key` against a pattern where `*` stands for any run of characters.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return key.is_empty();
    };
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        // No `*` at all.
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
