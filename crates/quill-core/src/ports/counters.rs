//! Counter port - atomic view and like mutations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::LikeState;
use crate::error::RepoError;

/// Atomic counter operations on posts.
///
/// Implementations serialize mutations per post at the storage layer;
/// read-then-write on a stale copy is not allowed. `RepoError::NotFound` is
/// the only expected failure.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add one view and return the new count.
    async fn increment_views(&self, post_id: Uuid) -> Result<u64, RepoError>;

    /// Flip `user_id`'s membership in the post's liker set and bring the
    /// like count in line with it, in one atomic step.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeState, RepoError>;

    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;

    /// Delete a user with their profile, posts, comments and likes. Like
    /// counts on the posts they had liked are brought back in line in the
    /// same atomic step.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), RepoError>;
}
