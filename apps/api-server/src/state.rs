//! Application state - shared across all handlers.

use std::sync::Arc;

use thiserror::Error;

use quill_core::ports::{Cache, FileStorage, TokenService};
use quill_core::services::{
    AccountService, CacheTtls, ContentService, CounterService, InvalidationStrategy, ReadCache,
    Repositories,
};
use quill_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryStore, JwtTokenService, LocalFileStorage,
};

use crate::config::{AppConfig, CacheBackend, DatabaseSettings};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database unavailable: {0}")]
    Database(String),

    #[error("cache unavailable: {0}")]
    Cache(String),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentService>,
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<dyn TokenService>,
    pub cache_strategy: InvalidationStrategy,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let repos = connect_repositories(config).await?;

        let cache: Arc<dyn Cache> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(InMemoryCache::new()),
            CacheBackend::Redis => redis_cache().await?,
        };

        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(config.media_root.clone()));
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());

        let state = Self::assemble(repos, cache, config.cache_ttls, storage, tokens);
        tracing::info!(cache_strategy = ?state.cache_strategy, "Application state initialized");
        Ok(state)
    }

    /// Wire the services over already-built adapters.
    pub fn assemble(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        ttls: CacheTtls,
        storage: Arc<dyn FileStorage>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        let read_cache = Arc::new(ReadCache::new(cache, ttls));
        let cache_strategy = read_cache.strategy();
        let counters = Arc::new(CounterService::new(
            repos.counters.clone(),
            read_cache.clone(),
        ));

        let content = Arc::new(ContentService::new(
            repos.clone(),
            counters,
            read_cache.clone(),
            storage.clone(),
        ));
        let accounts = Arc::new(AccountService::new(
            repos,
            Arc::new(Argon2PasswordService::new()),
            tokens.clone(),
            storage,
            read_cache,
        ));

        Self {
            content,
            accounts,
            tokens,
            cache_strategy,
        }
    }
}

/// Repositories over the configured store, in-memory without `DATABASE_URL`.
pub async fn connect_repositories(config: &AppConfig) -> Result<Repositories, StartupError> {
    match &config.database {
        Some(settings) => database_repositories(settings).await,
        None => {
            tracing::warn!("DATABASE_URL not set. Running on the in-memory store.");
            Ok(Repositories::from_shared(Arc::new(InMemoryStore::new())))
        }
    }
}

#[cfg(feature = "postgres")]
async fn database_repositories(settings: &DatabaseSettings) -> Result<Repositories, StartupError> {
    use quill_infra::database::{
        DatabaseConfig, DatabaseConnections, PostgresCommentRepository, PostgresPostRepository,
        PostgresProfileRepository, PostgresUserRepository,
    };

    let mut db_config = DatabaseConfig::new(settings.url.clone());
    db_config.max_connections = settings.max_connections;
    db_config.min_connections = settings.min_connections;

    let connections = DatabaseConnections::init(&db_config)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    let db = connections.main;

    let posts = Arc::new(PostgresPostRepository::new(db.clone()));
    Ok(Repositories {
        posts: posts.clone(),
        comments: Arc::new(PostgresCommentRepository::new(db.clone())),
        users: Arc::new(PostgresUserRepository::new(db.clone())),
        profiles: Arc::new(PostgresProfileRepository::new(db)),
        counters: posts,
    })
}

#[cfg(not(feature = "postgres"))]
async fn database_repositories(_settings: &DatabaseSettings) -> Result<Repositories, StartupError> {
    tracing::warn!("Built without the postgres feature. Ignoring DATABASE_URL.");
    Ok(Repositories::from_shared(Arc::new(InMemoryStore::new())))
}

#[cfg(feature = "redis")]
async fn redis_cache() -> Result<Arc<dyn Cache>, StartupError> {
    use quill_infra::{RedisCache, RedisConfig};

    let config = RedisConfig::from_env();
    let fallback = config.fallback_to_memory;
    match RedisCache::new(config).await {
        Ok(cache) => Ok(Arc::new(cache)),
        Err(e) if fallback => {
            tracing::warn!(error = %e, "Redis unavailable. Falling back to in-memory cache.");
            Ok(Arc::new(InMemoryCache::new()))
        }
        Err(e) => Err(StartupError::Cache(e.to_string())),
    }
}

#[cfg(not(feature = "redis"))]
async fn redis_cache() -> Result<Arc<dyn Cache>, StartupError> {
    tracing::warn!("Built without the redis feature. Using in-memory cache.");
    Ok(Arc::new(InMemoryCache::new()))
}
