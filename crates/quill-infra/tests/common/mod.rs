#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use quill_core::domain::{PostDraft, PostStatus, Profile, User, Viewer};
use quill_core::ports::BaseRepository;
use quill_core::services::validation::{FEATURED_IMAGES_DIR, PROFILE_PICS_DIR, media_prefix};
use quill_core::services::{
    AccountService, CacheTtls, ContentService, CounterService, PostDetail, ReadCache, Repositories,
};
use quill_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryFileStorage, InMemoryStore, JwtConfig,
    JwtTokenService,
};

/// Services wired to in-memory adapters.
pub struct Harness {
    pub repos: Repositories,
    pub cache: Arc<InMemoryCache>,
    pub files: Arc<InMemoryFileStorage>,
    pub content: ContentService,
    pub accounts: AccountService,
}

impl Harness {
    pub fn new() -> Self {
        let repos = Repositories::from_shared(Arc::new(InMemoryStore::new()));
        let cache = Arc::new(InMemoryCache::new());
        let files = Arc::new(InMemoryFileStorage::new());

        let read_cache = Arc::new(ReadCache::new(cache.clone(), CacheTtls::default()));
        let counters = Arc::new(CounterService::new(
            repos.counters.clone(),
            read_cache.clone(),
        ));
        let content = ContentService::new(
            repos.clone(),
            counters,
            read_cache.clone(),
            files.clone(),
        );
        let accounts = AccountService::new(
            repos.clone(),
            Arc::new(Argon2PasswordService::new()),
            Arc::new(JwtTokenService::new(JwtConfig {
                secret: "test-secret".into(),
                expiration_hours: 1,
                issuer: "quill-test".into(),
            })),
            files.clone(),
            read_cache,
        );

        Self {
            repos,
            cache,
            files,
            content,
            accounts,
        }
    }

    /// Insert a user and profile directly, skipping password hashing.
    pub async fn user(&self, username: &str) -> Viewer {
        let user = User::new(
            username.to_string(),
            format!("{username}@example.com"),
            "unused".to_string(),
        );
        let user = self.repos.users.insert(user).await.unwrap();
        self.repos.profiles.insert(Profile::new(user.id)).await.unwrap();
        Viewer::User(user.id)
    }

    pub async fn publish(&self, author: Viewer, title: &str, content: &str) -> PostDetail {
        self.content
            .create(
                author,
                PostDraft {
                    title: title.into(),
                    content: content.into(),
                    status: PostStatus::Published,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn publish_at(
        &self,
        author: Viewer,
        title: &str,
        pub_date: DateTime<Utc>,
    ) -> PostDetail {
        self.content
            .create(
                author,
                PostDraft {
                    title: title.into(),
                    content: "Body text for this post.".into(),
                    status: PostStatus::Published,
                    pub_date: Some(pub_date),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn draft(&self, author: Viewer, title: &str) -> PostDetail {
        self.content
            .create(
                author,
                PostDraft {
                    title: title.into(),
                    content: "Draft body, not public yet.".into(),
                    status: PostStatus::Draft,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }
}

pub fn user_id(viewer: Viewer) -> Uuid {
    viewer.user_id().unwrap()
}

/// A featured image path inside `owner`'s directory.
pub fn featured_image(owner: Viewer, name: &str) -> String {
    format!("{}{name}", media_prefix(FEATURED_IMAGES_DIR, user_id(owner)))
}

/// A profile picture path inside `owner`'s directory.
pub fn profile_picture(owner: Viewer, name: &str) -> String {
    format!("{}{name}", media_prefix(PROFILE_PICS_DIR, user_id(owner)))
}
