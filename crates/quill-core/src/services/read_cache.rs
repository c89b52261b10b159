//! Cache of serialized post snapshots.
//!
//! Detail entries live under `post_detail_<slug>:<anon|auth>` and list pages
//! under `post_list:<anon|user:<id>>:<query>`. Any write to a post drops its
//! detail entries and every list page. Backends that cannot delete by pattern
//! are cleared entirely instead.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::Viewer;
use crate::ports::Cache;

pub const DETAIL_PREFIX: &str = "post_detail_";
pub const LIST_PREFIX: &str = "post_list";

const ANON: &str = "anon";
const AUTH: &str = "auth";

/// Time-to-live for each kind of entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub detail: Duration,
    pub list: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            detail: Duration::from_secs(5 * 60),
            list: Duration::from_secs(15 * 60),
        }
    }
}

/// How list pages get invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationStrategy {
    /// Delete `*post_list*` by pattern.
    Pattern,
    /// Flush the whole cache.
    ClearAll,
}

pub struct ReadCache {
    cache: Arc<dyn Cache>,
    strategy: InvalidationStrategy,
    ttls: CacheTtls,
}

impl ReadCache {
    pub fn new(cache: Arc<dyn Cache>, ttls: CacheTtls) -> Self {
        let strategy = if cache.capabilities().pattern_delete {
            InvalidationStrategy::Pattern
        } else {
            InvalidationStrategy::ClearAll
        };
        tracing::info!(?strategy, "Read cache initialized");

        Self {
            cache,
            strategy,
            ttls,
        }
    }

    pub fn strategy(&self) -> InvalidationStrategy {
        self.strategy
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    pub fn detail_key(slug: &str, viewer: Viewer) -> String {
        let variant = if viewer.is_authenticated() { AUTH } else { ANON };
        format!("{DETAIL_PREFIX}{slug}:{variant}")
    }

    fn detail_keys(slug: &str) -> [String; 2] {
        [ANON, AUTH].map(|variant| format!("{DETAIL_PREFIX}{slug}:{variant}"))
    }

    /// List pages vary per user, since authors also see their own drafts.
    pub fn list_key(viewer: Viewer, fingerprint: &str) -> String {
        match viewer.user_id() {
            Some(id) => format!("{LIST_PREFIX}:user:{id}:{fingerprint}"),
            None => format!("{LIST_PREFIX}:{ANON}:{fingerprint}"),
        }
    }

    /// Fetch and decode a snapshot. Undecodable entries count as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.cache.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store a snapshot. A zero TTL disables caching for that entry kind.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, Some(ttl)).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    pub async fn put_detail<T: Serialize>(&self, key: &str, value: &T) {
        self.put(key, value, self.ttls.detail).await;
    }

    pub async fn put_list<T: Serialize>(&self, key: &str, value: &T) {
        self.put(key, value, self.ttls.list).await;
    }

    /// Drop everything a write to the post identified by `slug` makes stale.
    pub async fn invalidate_post(&self, slug: &str) {
        match self.strategy {
            InvalidationStrategy::Pattern => {
                for key in Self::detail_keys(slug) {
                    if let Err(e) = self.cache.delete(&key).await {
                        tracing::warn!(key = %key, error = %e, "Cache delete failed");
                    }
                }

                let pattern = format!("*{LIST_PREFIX}*");
                match self.cache.delete_pattern(&pattern).await {
                    Ok(removed) => {
                        tracing::debug!(slug = %slug, removed, "Invalidated post cache entries")
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Pattern delete failed, clearing cache");
                        self.clear().await;
                    }
                }
            }
            InvalidationStrategy::ClearAll => self.clear().await,
        }
    }

    /// Drop every detail and list entry.
    pub async fn invalidate_all(&self) {
        if self.strategy == InvalidationStrategy::ClearAll {
            self.clear().await;
            return;
        }
        for pattern in [format!("*{DETAIL_PREFIX}*"), format!("*{LIST_PREFIX}*")] {
            if let Err(e) = self.cache.delete_pattern(&pattern).await {
                tracing::warn!(error = %e, "Pattern delete failed, clearing cache");
                self.clear().await;
                return;
            }
        }
        tracing::debug!("Invalidated all post cache entries");
    }

    async fn clear(&self) {
        if let Err(e) = self.cache.clear().await {
            tracing::error!(error = %e, "Cache clear failed, stale entries may be served until expiry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::ports::{CacheCapabilities, CacheError};

    /// Minimal backend without pattern support.
    #[derive(Default)]
    struct PlainCache {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl Cache for PlainCache {
        async fn get(&self, key: &str) -> Option<String> {
            self.entries.lock().await.get(key).cloned()
        }

        async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.entries.lock().await.remove(key);
            Ok(())
        }

        async fn exists(&self, key: &str) -> bool {
            self.entries.lock().await.contains_key(key)
        }

        async fn clear(&self) -> Result<(), CacheError> {
            self.entries.lock().await.clear();
            Ok(())
        }
    }

    /// Backend that claims pattern support.
    #[derive(Default)]
    struct PatternCache {
        inner: PlainCache,
    }

    #[async_trait]
    impl Cache for PatternCache {
        async fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> bool {
            self.inner.exists(key).await
        }

        async fn clear(&self) -> Result<(), CacheError> {
            self.inner.clear().await
        }

        fn capabilities(&self) -> CacheCapabilities {
            CacheCapabilities {
                pattern_delete: true,
            }
        }

        async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
            let needle = pattern.trim_matches('*').to_string();
            let mut entries = self.inner.entries.lock().await;
            let before = entries.len();
            entries.retain(|k, _| !k.contains(&needle));
            Ok((before - entries.len()) as u64)
        }
    }

    #[test]
    fn test_keys_vary_on_auth_state() {
        let anon = ReadCache::detail_key("hello", Viewer::Anonymous);
        let auth = ReadCache::detail_key("hello", Viewer::User(Uuid::new_v4()));

        assert_eq!(anon, "post_detail_hello:anon");
        assert_eq!(auth, "post_detail_hello:auth");

        let user = Uuid::new_v4();
        assert_ne!(
            ReadCache::list_key(Viewer::Anonymous, "page=1"),
            ReadCache::list_key(Viewer::User(user), "page=1")
        );
        assert!(ReadCache::list_key(Viewer::User(user), "page=1").starts_with(LIST_PREFIX));
    }

    #[tokio::test]
    async fn test_strategy_follows_capabilities() {
        let plain = ReadCache::new(Arc::new(PlainCache::default()), CacheTtls::default());
        let pattern = ReadCache::new(Arc::new(PatternCache::default()), CacheTtls::default());

        assert_eq!(plain.strategy(), InvalidationStrategy::ClearAll);
        assert_eq!(pattern.strategy(), InvalidationStrategy::Pattern);
    }

    #[tokio::test]
    async fn test_pattern_invalidation_keeps_unrelated_entries() {
        let backend = Arc::new(PatternCache::default());
        let cache = ReadCache::new(backend.clone(), CacheTtls::default());

        cache.put_detail("post_detail_a:anon", &"a").await;
        cache.put_detail("post_detail_a:auth", &"a").await;
        cache.put_detail("post_detail_b:anon", &"b").await;
        cache.put_list("post_list:anon:page=1", &vec!["a"]).await;
        backend.set("session:xyz", "keep", None).await.unwrap();

        cache.invalidate_post("a").await;

        assert!(!backend.exists("post_detail_a:anon").await);
        assert!(!backend.exists("post_detail_a:auth").await);
        assert!(!backend.exists("post_list:anon:page=1").await);
        assert!(backend.exists("post_detail_b:anon").await);
        assert!(backend.exists("session:xyz").await);
    }

    #[tokio::test]
    async fn test_clear_all_fallback_without_pattern_support() {
        let backend = Arc::new(PlainCache::default());
        let cache = ReadCache::new(backend.clone(), CacheTtls::default());

        cache.put_detail("post_detail_b:anon", &"b").await;
        cache.put_list("post_list:anon:page=1", &vec!["b"]).await;

        cache.invalidate_post("a").await;

        assert!(!backend.exists("post_detail_b:anon").await);
        assert!(!backend.exists("post_list:anon:page=1").await);
    }

    #[tokio::test]
    async fn test_invalidate_all_drops_every_snapshot() {
        let backend = Arc::new(PatternCache::default());
        let cache = ReadCache::new(backend.clone(), CacheTtls::default());

        cache.put_detail("post_detail_a:anon", &"a").await;
        cache.put_detail("post_detail_b:auth", &"b").await;
        cache.put_list("post_list:anon:page=1", &vec!["a"]).await;
        backend.set("session:xyz", "keep", None).await.unwrap();

        cache.invalidate_all().await;

        assert!(!backend.exists("post_detail_a:anon").await);
        assert!(!backend.exists("post_detail_b:auth").await);
        assert!(!backend.exists("post_list:anon:page=1").await);
        assert!(backend.exists("session:xyz").await);
    }

    #[tokio::test]
    async fn test_zero_ttl_skips_caching() {
        let backend = Arc::new(PlainCache::default());
        let ttls = CacheTtls {
            detail: Duration::ZERO,
            list: Duration::from_secs(60),
        };
        let cache = ReadCache::new(backend.clone(), ttls);

        cache.put_detail("post_detail_a:anon", &"a").await;
        cache.put_list("post_list:anon:page=1", &vec!["a"]).await;

        assert!(!backend.exists("post_detail_a:anon").await);
        assert!(backend.exists("post_list:anon:page=1").await);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let backend = Arc::new(PlainCache::default());
        let cache = ReadCache::new(backend.clone(), CacheTtls::default());
        backend.set("post_detail_x:anon", "not json", None).await.unwrap();

        let value: Option<Vec<String>> = cache.get("post_detail_x:anon").await;
        assert!(value.is_none());
    }
}
