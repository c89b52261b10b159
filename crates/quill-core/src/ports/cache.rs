use async_trait::async_trait;
use std::time::Duration;

/// What a cache backend can do beyond plain key operations.
///
/// Read once when the read cache is built; never re-read per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCapabilities {
    /// `delete_pattern` is implemented.
    pub pattern_delete: bool,
}

/// Cache trait - abstraction over caching backends (Redis, in-memory).
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value from the cache.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value in the cache with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> bool;

    /// Drop every entry.
    async fn clear(&self) -> Result<(), CacheError>;

    fn capabilities(&self) -> CacheCapabilities {
        CacheCapabilities::default()
    }

    /// Delete every key matching a glob pattern (`*` wildcards), returning
    /// how many were removed.
    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::Unsupported("pattern delete"))
    }
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}
