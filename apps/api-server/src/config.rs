//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quill_core::services::CacheTtls;

/// Which backend holds the read cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl CacheBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "memory" | "local" => Some(Self::Memory),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

/// Connection settings for the relational store.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs on the in-memory store.
    pub database: Option<DatabaseSettings>,
    pub cache_backend: CacheBackend,
    pub cache_ttls: CacheTtls,
    /// Directory uploaded media lives in.
    pub media_root: PathBuf,
    /// URL prefix media is served under, as it appears in post bodies.
    pub media_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseSettings {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS", 100),
            min_connections: parsed("DB_MIN_CONNECTIONS", 10),
        });

        let cache_backend = match env::var("CACHE_BACKEND") {
            Ok(raw) => CacheBackend::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown CACHE_BACKEND, using memory");
                CacheBackend::Memory
            }),
            Err(_) if env::var("REDIS_URL").is_ok() => CacheBackend::Redis,
            Err(_) => CacheBackend::Memory,
        };

        // A TTL of 0 turns caching off for that entry kind.
        let defaults = CacheTtls::default();
        let cache_ttls = CacheTtls {
            detail: Duration::from_secs(parsed("CACHE_DETAIL_TTL_SECS", defaults.detail.as_secs())),
            list: Duration::from_secs(parsed("CACHE_LIST_TTL_SECS", defaults.list.as_secs())),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            database,
            cache_backend,
            cache_ttls,
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            media_url: env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string()),
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
