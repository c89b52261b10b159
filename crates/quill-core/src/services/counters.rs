//! View and like counters.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{LikeState, Post};
use crate::error::{DomainError, RepoError};
use crate::ports::CounterStore;

use super::read_cache::ReadCache;

pub struct CounterService {
    store: Arc<dyn CounterStore>,
    cache: Arc<ReadCache>,
}

impl CounterService {
    pub fn new(store: Arc<dyn CounterStore>, cache: Arc<ReadCache>) -> Self {
        Self { store, cache }
    }

    /// Count one view of a post and return the new total.
    ///
    /// Storage failures other than a missing post come back as
    /// `DomainError::ConflictIgnored` so readers can carry on. Cached
    /// snapshots are left alone; callers overlay the returned value.
    pub async fn increment_views(&self, post_id: Uuid) -> Result<u64, DomainError> {
        match self.store.increment_views(post_id).await {
            Ok(count) => Ok(count),
            Err(RepoError::NotFound) => Err(DomainError::not_found("post", post_id)),
            Err(e) => Err(DomainError::ConflictIgnored(e.to_string())),
        }
    }

    /// Flip the viewer's like on `post` and drop the post's cached snapshots.
    pub async fn toggle_like(&self, post: &Post, user_id: Uuid) -> Result<LikeState, DomainError> {
        let state = match self.store.toggle_like(post.id, user_id).await {
            Ok(state) => state,
            Err(RepoError::NotFound) => return Err(DomainError::not_found("post", &post.slug)),
            Err(e) => {
                tracing::error!(post_id = %post.id, error = %e, "Like toggle failed");
                return Err(DomainError::Internal(e.to_string()));
            }
        };

        tracing::debug!(
            post_id = %post.id,
            liked = state.liked,
            likes = state.likes_count,
            "Like toggled"
        );
        self.cache.invalidate_post(&post.slug).await;
        Ok(state)
    }

    pub async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.store.has_liked(post_id, user_id).await?)
    }
}
