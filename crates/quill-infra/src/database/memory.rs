//! In-memory store - used when no database is configured, and by tests.
//!
//! Every repository and the counter store share one lock, so counter
//! mutations are as atomic here as the row-locked SQL versions.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Comment, LikeState, Post, Profile, User, VisibilityFilter};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, CommentRepository, CounterStore, PostQuery, PostRepository, ProfileRepository,
    UserRepository,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    /// `(post_id, user_id)` pairs.
    likes: HashSet<(Uuid, Uuid)>,
}

impl State {
    fn remove_post(&mut self, post_id: Uuid) -> Option<Post> {
        let post = self.posts.remove(&post_id)?;
        self.comments.retain(|_, c| c.post_id != post_id);
        self.likes.retain(|(p, _)| *p != post_id);
        Some(post)
    }

    /// Cascade like the SQL foreign keys do, then recount the posts the user
    /// had liked.
    fn remove_user(&mut self, id: Uuid) -> Result<(), RepoError> {
        if self.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        self.profiles.remove(&id);

        let authored: Vec<Uuid> = self
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            self.remove_post(post_id);
        }

        self.comments.retain(|_, c| c.author_id != id);
        let liked: Vec<Uuid> = self
            .likes
            .iter()
            .filter(|(_, user)| *user == id)
            .map(|(post, _)| *post)
            .collect();
        self.likes.retain(|(_, user)| *user != id);
        for post_id in liked {
            self.recount_likes(post_id);
        }
        Ok(())
    }

    fn recount_likes(&mut self, post_id: Uuid) -> u64 {
        let count = self.likes.iter().filter(|(p, _)| *p == post_id).count() as u64;
        if let Some(post) = self.posts.get_mut(&post_id) {
            post.likes = count;
        }
        count
    }
}

/// Process-local storage for users, profiles, posts, comments and likes.
/// Data is lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|u| u.id == user.id || u.username == user.username || u.email == user.email);
        if taken {
            return Err(RepoError::Constraint("users: duplicate key".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        let clash = state
            .users
            .values()
            .any(|u| u.id != user.id && (u.username == user.username || u.email == user.email));
        if clash {
            return Err(RepoError::Constraint("users: duplicate key".to_string()));
        }
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(RepoError::NotFound),
        }
    }

    /// Removes the user and everything that references them.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.write().await.remove_user(id)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn search_ids(&self, term: &str) -> Result<Vec<Uuid>, RepoError> {
        let term = term.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.username.to_lowercase().contains(&term))
            .map(|u| u.id)
            .collect())
    }

    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

#[async_trait]
impl BaseRepository<Profile, Uuid> for InMemoryStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Profile>, RepoError> {
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn insert(&self, profile: Profile) -> Result<Profile, RepoError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&profile.user_id) {
            return Err(RepoError::Constraint("profiles: unknown user".to_string()));
        }
        if state.profiles.contains_key(&profile.user_id) {
            return Err(RepoError::Constraint("profiles: duplicate key".to_string()));
        }
        state.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn update(&self, profile: Profile) -> Result<Profile, RepoError> {
        let mut state = self.state.write().await;
        match state.profiles.get_mut(&profile.user_id) {
            Some(existing) => {
                *existing = profile.clone();
                Ok(profile)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state
            .profiles
            .remove(&user_id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn find_by_user_ids(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, RepoError> {
        let state = self.state.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn insert(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(RepoError::NotFound);
        }
        if state.comments.contains_key(&comment.id) {
            return Err(RepoError::Constraint("comments: duplicate key".to_string()));
        }
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut state = self.state.write().await;
        match state.comments.get_mut(&comment.id) {
            Some(existing) => {
                *existing = comment.clone();
                Ok(comment)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn list_approved(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.approved)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn count_approved(&self, post_ids: &[Uuid]) -> Result<Vec<(Uuid, u64)>, RepoError> {
        let state = self.state.read().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for comment in state.comments.values() {
            if comment.approved && post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.values().find(|p| p.slug == slug).cloned())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.values().any(|p| p.slug == slug))
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        if state.posts.values().any(|p| p.slug == post.slug) {
            return Err(RepoError::Constraint(format!(
                "posts: slug `{}` already exists",
                post.slug
            )));
        }
        if !state.users.contains_key(&post.author_id) {
            return Err(RepoError::Constraint("posts: unknown author".to_string()));
        }
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: &Post) -> Result<Post, RepoError> {
        let mut state = self.state.write().await;
        let stored = state.posts.get_mut(&post.id).ok_or(RepoError::NotFound)?;

        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.status = post.status;
        stored.pub_date = post.pub_date;
        stored.reading_time = post.reading_time;
        stored.featured_image = post.featured_image.clone();
        stored.updated_at = post.updated_at;

        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.remove_post(id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn list(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), RepoError> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        let total = posts.len() as u64;

        query.sort(&mut posts);
        let page = posts
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .collect();

        Ok((page, total))
    }

    async fn count_visible_by_author(
        &self,
        author_id: Uuid,
        visibility: VisibilityFilter,
    ) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .filter(|p| p.author_id == author_id && visibility.matches(p))
            .count() as u64)
    }

    async fn all_contents(&self) -> Result<Vec<String>, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.values().map(|p| p.content.clone()).collect())
    }

    async fn image_in_use(&self, path: &str) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .any(|p| p.featured_image.as_deref() == Some(path)))
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn increment_views(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let post = state.posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
        post.views_count += 1;
        Ok(post.views_count)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeState, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }

        let liked = if state.likes.remove(&(post_id, user_id)) {
            false
        } else {
            state.likes.insert((post_id, user_id));
            true
        };
        let likes_count = state.recount_likes(post_id);

        Ok(LikeState { liked, likes_count })
    }

    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        Ok(self.state.read().await.likes.contains(&(post_id, user_id)))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), RepoError> {
        self.state.write().await.remove_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quill_core::domain::{PostDraft, PostStatus};

    use super::*;

    async fn seeded() -> (InMemoryStore, User, Post) {
        let store = InMemoryStore::new();
        let user = User::new("alice".into(), "alice@example.com".into(), "hash".into());
        BaseRepository::<User, Uuid>::insert(&store, user.clone())
            .await
            .unwrap();

        let mut post = Post::new(
            user.id,
            PostDraft {
                title: "Hello".into(),
                content: "Hello world body".into(),
                status: PostStatus::Published,
                ..Default::default()
            },
        );
        post.slug = "hello".into();
        let post = PostRepository::insert(&store, post).await.unwrap();
        (store, user, post)
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_a_constraint_error() {
        let (store, user, post) = seeded().await;
        let mut twin = Post::new(user.id, PostDraft::default());
        twin.slug = post.slug.clone();

        let result = PostRepository::insert(&store, twin).await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_counters() {
        let (store, _user, mut post) = seeded().await;
        store.increment_views(post.id).await.unwrap();

        post.title = "Edited".into();
        post.views_count = 0;
        let saved = PostRepository::update(&store, &post).await.unwrap();

        assert_eq!(saved.title, "Edited");
        assert_eq!(saved.views_count, 1);
    }

    #[tokio::test]
    async fn test_toggle_like_keeps_count_in_sync() {
        let (store, user, post) = seeded().await;

        let first = store.toggle_like(post.id, user.id).await.unwrap();
        assert!(first.liked);
        assert_eq!(first.likes_count, 1);

        let second = store.toggle_like(post.id, user.id).await.unwrap();
        assert!(!second.liked);
        assert_eq!(second.likes_count, 0);
        assert!(!store.has_liked(post.id, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_view_increments_are_not_lost() {
        let (store, _user, post) = seeded().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_views(post.id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = PostRepository::find_by_id(store.as_ref(), post.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.views_count, 50);
    }

    #[tokio::test]
    async fn test_deleting_liker_recounts_likes() {
        let (store, _author, post) = seeded().await;
        let fan = User::new("bob".into(), "bob@example.com".into(), "hash".into());
        BaseRepository::<User, Uuid>::insert(&store, fan.clone())
            .await
            .unwrap();
        store.toggle_like(post.id, fan.id).await.unwrap();

        store.delete_user(fan.id).await.unwrap();

        let stored = PostRepository::find_by_id(&store, post.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.likes, 0);
        assert!(!store.has_liked(post.id, fan.id).await.unwrap());
        assert!(matches!(
            store.delete_user(fan.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_deleting_post_cascades() {
        let (store, user, post) = seeded().await;
        BaseRepository::<Comment, Uuid>::insert(&store, Comment::new(post.id, user.id, "hi".into()))
            .await
            .unwrap();
        store.toggle_like(post.id, user.id).await.unwrap();

        PostRepository::delete(&store, post.id).await.unwrap();

        assert!(store.list_approved(post.id).await.unwrap().is_empty());
        assert!(!store.has_liked(post.id, user.id).await.unwrap());
        assert!(matches!(
            store.increment_views(post.id).await,
            Err(RepoError::NotFound)
        ));
    }
}
