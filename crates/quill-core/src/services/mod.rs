//! Application services - the operations the HTTP layer calls.

use std::sync::Arc;

use crate::ports::{
    CommentRepository, CounterStore, PostRepository, ProfileRepository, UserRepository,
};

pub mod accounts;
pub mod content;
pub mod counters;
pub mod maintenance;
pub mod read_cache;
pub mod read_models;
pub mod validation;

pub use accounts::{AccountService, IssuedToken, ProfileUpdate, Registration};
pub use content::{ContentService, DEFAULT_PAGE_SIZE, ListParams, MAX_PAGE_SIZE};
pub use counters::CounterService;
pub use maintenance::{OrphanSweeper, SweepReport};
pub use read_cache::{CacheTtls, InvalidationStrategy, ReadCache};
pub use read_models::{
    CommentView, LiveCounters, Page, PostDetail, PostSummary, UserDetail, UserSummary,
};

/// Storage handles shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub counters: Arc<dyn CounterStore>,
}

impl Repositories {
    /// Use one backend for every repository.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: PostRepository
            + CommentRepository
            + UserRepository
            + ProfileRepository
            + CounterStore
            + 'static,
    {
        Self {
            posts: store.clone(),
            comments: store.clone(),
            users: store.clone(),
            profiles: store.clone(),
            counters: store,
        }
    }
}
