//! Post and comment reads and writes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::slug::{candidates, derive_slug};
use crate::domain::{
    Author, Comment, Post, PostDraft, PostPatch, PostStatus, Profile, Viewer, VisibilityFilter,
    VisibilityPolicy,
};
use crate::error::{DomainError, RepoError};
use crate::ports::{BaseRepository, FileStorage, PostOrdering, PostQuery, PostSearch};

use super::Repositories;
use super::counters::CounterService;
use super::read_cache::ReadCache;
use super::read_models::{CommentView, LiveCounters, Page, PostDetail, PostSummary};
use super::validation::{validate_comment, validate_draft, validate_patch};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Listing filters as received from the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub status: Option<PostStatus>,
    pub author: Option<String>,
    pub search: Option<String>,
    pub ordering: PostOrdering,
    pub page: u64,
    pub page_size: u64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            status: None,
            author: None,
            search: None,
            ordering: PostOrdering::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListParams {
    fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.author = self
            .author
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Stable cache key component for these parameters.
    pub fn fingerprint(&self) -> String {
        format!(
            "status={}&author={}&search={}&ordering={}&page={}&page_size={}",
            self.status.map(|s| s.as_str()).unwrap_or(""),
            self.author.as_deref().unwrap_or(""),
            self.search.as_deref().unwrap_or(""),
            self.ordering.as_param(),
            self.page,
            self.page_size,
        )
    }
}

pub struct ContentService {
    repos: Repositories,
    counters: Arc<CounterService>,
    cache: Arc<ReadCache>,
    storage: Arc<dyn FileStorage>,
}

impl ContentService {
    pub fn new(
        repos: Repositories,
        counters: Arc<CounterService>,
        cache: Arc<ReadCache>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            repos,
            counters,
            cache,
            storage,
        }
    }

    /// Posts the viewer may see, filtered and paginated. Pages are cached
    /// per viewer.
    pub async fn list_visible(
        &self,
        viewer: Viewer,
        params: ListParams,
    ) -> Result<Page<PostSummary>, DomainError> {
        let params = params.normalized();
        let key = ReadCache::list_key(viewer, &params.fingerprint());
        if let Some(page) = self.cache.get::<Page<PostSummary>>(&key).await {
            return Ok(page);
        }

        let mut query = PostQuery::new(VisibilityPolicy::filter(viewer, Utc::now()));
        query.status = params.status;
        query.ordering = params.ordering;
        query.offset = params.offset();
        query.limit = params.page_size;

        if let Some(username) = &params.author {
            match self.repos.users.find_by_username(username).await? {
                Some(user) => query.author_id = Some(user.id),
                None => return Ok(Page::empty(params.page, params.page_size)),
            }
        }
        if let Some(term) = &params.search {
            let author_ids = self.repos.users.search_ids(term).await?;
            query.search = Some(PostSearch {
                term: term.clone(),
                author_ids,
            });
        }

        let page = self.summarize(&query, params.page, params.page_size).await?;
        self.cache.put_list(&key, &page).await;
        Ok(page)
    }

    /// Publicly visible posts by one author, newest first.
    pub async fn list_by_author(
        &self,
        username: &str,
        page: u64,
        page_size: u64,
    ) -> Result<Page<PostSummary>, DomainError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let Some(user) = self.repos.users.find_by_username(username).await? else {
            return Ok(Page::empty(page, page_size));
        };

        let mut query = PostQuery::new(VisibilityFilter::public(Utc::now()));
        query.author_id = Some(user.id);
        query.offset = (page - 1).saturating_mul(page_size);
        query.limit = page_size;

        self.summarize(&query, page, page_size).await
    }

    /// A single post, if the viewer may see it. Hidden and missing posts are
    /// both `NotFound`.
    pub async fn get(&self, slug: &str, viewer: Viewer) -> Result<Post, DomainError> {
        let now = Utc::now();
        self.repos
            .posts
            .find_by_slug(slug)
            .await?
            .filter(|post| VisibilityPolicy::is_visible(post, viewer, now))
            .ok_or_else(|| DomainError::not_found("post", slug))
    }

    /// Full post for display. Counts a view, serves the body from the read
    /// cache when possible, and overlays live counters and viewer flags.
    pub async fn read_detail(&self, slug: &str, viewer: Viewer) -> Result<PostDetail, DomainError> {
        let post = self.get(slug, viewer).await?;

        let views_count = match self.counters.increment_views(post.id).await {
            Ok(count) => count,
            Err(DomainError::ConflictIgnored(reason)) => {
                tracing::warn!(post_id = %post.id, reason = %reason, "View not recorded");
                post.views_count
            }
            Err(e) => return Err(e),
        };

        let key = ReadCache::detail_key(&post.slug, viewer);
        let snapshot = match self.cache.get::<PostDetail>(&key).await {
            Some(snapshot) => snapshot,
            None => {
                tracing::debug!(key = %key, "Detail cache miss");
                let snapshot = self.build_detail(&post).await?;
                self.cache.put_detail(&key, &snapshot).await;
                snapshot
            }
        };

        let live = LiveCounters {
            views_count,
            likes: post.likes,
        };
        self.overlay(snapshot, &post, live, viewer).await
    }

    pub async fn create(&self, viewer: Viewer, draft: PostDraft) -> Result<PostDetail, DomainError> {
        let author_id = viewer.user_id().ok_or(DomainError::Unauthorized)?;
        let draft = validate_draft(draft, author_id)?;

        let base = derive_slug(&draft.title);
        let mut post = Post::new(author_id, draft);

        for candidate in candidates(&base) {
            if self.repos.posts.slug_exists(&candidate).await? {
                continue;
            }
            post.slug = candidate;

            match self.repos.posts.insert(post.clone()).await {
                Ok(saved) => {
                    tracing::info!(post_id = %saved.id, slug = %saved.slug, "Post created");
                    self.cache.invalidate_post(&saved.slug).await;
                    return self.fresh_detail(&saved, viewer).await;
                }
                Err(RepoError::Constraint(reason)) => {
                    tracing::debug!(slug = %post.slug, reason = %reason, "Slug taken concurrently, trying next");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DomainError::Duplicate(format!("no free slug for `{base}`")))
    }

    /// Edit a post. Only its author may; the slug never changes.
    pub async fn update(
        &self,
        slug: &str,
        viewer: Viewer,
        patch: PostPatch,
    ) -> Result<PostDetail, DomainError> {
        let mut post = self.authored(slug, viewer).await?;
        let patch = validate_patch(patch, post.author_id)?;

        let replaced = post.apply(patch);
        let saved = self.repos.posts.update(&post).await?;
        tracing::info!(post_id = %saved.id, slug = %saved.slug, "Post updated");

        self.cache.invalidate_post(&saved.slug).await;
        if let Some(old) = replaced {
            self.release_image(&old).await;
        }

        self.fresh_detail(&saved, viewer).await
    }

    /// Delete a post with its comments and likes. Only its author may.
    pub async fn delete(&self, slug: &str, viewer: Viewer) -> Result<(), DomainError> {
        let post = self.authored(slug, viewer).await?;

        self.repos.posts.delete(post.id).await?;
        tracing::info!(post_id = %post.id, slug = %post.slug, "Post deleted");

        self.cache.invalidate_post(&post.slug).await;
        if let Some(image) = &post.featured_image {
            self.release_image(image).await;
        }
        Ok(())
    }

    pub async fn toggle_like(
        &self,
        slug: &str,
        viewer: Viewer,
    ) -> Result<crate::domain::LikeState, DomainError> {
        let user_id = viewer.user_id().ok_or(DomainError::Unauthorized)?;
        let post = self.get(slug, viewer).await?;
        self.counters.toggle_like(&post, user_id).await
    }

    /// Approved comments, newest first.
    pub async fn list_comments(
        &self,
        slug: &str,
        viewer: Viewer,
    ) -> Result<Vec<CommentView>, DomainError> {
        let post = self.get(slug, viewer).await?;
        let comments = self.repos.comments.list_approved(post.id).await?;
        let authors = self.authors(comments.iter().map(|c| c.author_id)).await?;

        Ok(comments
            .iter()
            .map(|c| CommentView::build(c, author_or_placeholder(&authors, c.author_id)))
            .collect())
    }

    pub async fn add_comment(
        &self,
        slug: &str,
        viewer: Viewer,
        content: String,
    ) -> Result<CommentView, DomainError> {
        let user_id = viewer.user_id().ok_or(DomainError::Unauthorized)?;
        let post = self.get(slug, viewer).await?;
        validate_comment(&content)?;

        let comment = self
            .repos
            .comments
            .insert(Comment::new(post.id, user_id, content))
            .await?;
        tracing::debug!(post_id = %post.id, comment_id = %comment.id, "Comment added");

        self.cache.invalidate_post(&post.slug).await;

        let authors = self.authors([user_id]).await?;
        Ok(CommentView::build(
            &comment,
            author_or_placeholder(&authors, user_id),
        ))
    }

    /// Resolve a post the viewer is allowed to modify.
    async fn authored(&self, slug: &str, viewer: Viewer) -> Result<Post, DomainError> {
        let user_id = viewer.user_id().ok_or(DomainError::Unauthorized)?;
        let post = self.get(slug, viewer).await?;
        if !post.is_authored_by(user_id) {
            return Err(DomainError::Forbidden);
        }
        Ok(post)
    }

    async fn summarize(
        &self,
        query: &PostQuery,
        page: u64,
        page_size: u64,
    ) -> Result<Page<PostSummary>, DomainError> {
        let (posts, count) = self.repos.posts.list(query).await?;

        let authors = self.authors(posts.iter().map(|p| p.author_id)).await?;
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let comment_counts: HashMap<Uuid, u64> = self
            .repos
            .comments
            .count_approved(&ids)
            .await?
            .into_iter()
            .collect();

        let results = posts
            .iter()
            .map(|p| {
                PostSummary::build(
                    p,
                    author_or_placeholder(&authors, p.author_id),
                    comment_counts.get(&p.id).copied().unwrap_or(0),
                )
            })
            .collect();

        Ok(Page {
            count,
            page,
            page_size,
            results,
        })
    }

    async fn build_detail(&self, post: &Post) -> Result<PostDetail, DomainError> {
        let comments = self.repos.comments.list_approved(post.id).await?;
        let authors = self
            .authors(std::iter::once(post.author_id).chain(comments.iter().map(|c| c.author_id)))
            .await?;

        let comment_views = comments
            .iter()
            .map(|c| CommentView::build(c, author_or_placeholder(&authors, c.author_id)))
            .collect();

        Ok(PostDetail::build(
            post,
            author_or_placeholder(&authors, post.author_id),
            comment_views,
        ))
    }

    /// Detail straight from storage, for write responses.
    async fn fresh_detail(&self, post: &Post, viewer: Viewer) -> Result<PostDetail, DomainError> {
        let detail = self.build_detail(post).await?;
        let live = LiveCounters {
            views_count: post.views_count,
            likes: post.likes,
        };
        self.overlay(detail, post, live, viewer).await
    }

    async fn overlay(
        &self,
        detail: PostDetail,
        post: &Post,
        live: LiveCounters,
        viewer: Viewer,
    ) -> Result<PostDetail, DomainError> {
        let (is_liked, is_author) = match viewer.user_id() {
            Some(user_id) => (
                self.counters.has_liked(post.id, user_id).await?,
                post.is_authored_by(user_id),
            ),
            None => (false, false),
        };
        Ok(detail.overlay(live, is_liked, is_author))
    }

    async fn authors(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, Author>, DomainError> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self.repos.users.find_by_ids(&ids).await?;
        let profiles: HashMap<Uuid, Profile> = self
            .repos
            .profiles
            .find_by_user_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        Ok(users
            .iter()
            .map(|u| (u.id, Author::from_parts(u, profiles.get(&u.id))))
            .collect())
    }

    /// Delete a featured image no remaining post uses.
    async fn release_image(&self, path: &str) {
        match self.repos.posts.image_in_use(path).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!(path = %path, "Image still in use, keeping it");
                return;
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Could not check image usage, keeping it");
                return;
            }
        }
        if let Err(e) = self.storage.delete(path).await {
            tracing::warn!(path = %path, error = %e, "Failed to release stored file");
        }
    }
}

fn author_or_placeholder(authors: &HashMap<Uuid, Author>, id: Uuid) -> Author {
    authors.get(&id).cloned().unwrap_or_else(|| Author {
        id,
        username: "[deleted]".to_string(),
        bio: String::new(),
        profile_picture: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_normalization() {
        let params = ListParams {
            search: Some("   ".into()),
            author: Some(" bob ".into()),
            page: 0,
            page_size: 1000,
            ..Default::default()
        }
        .normalized();

        assert_eq!(params.search, None);
        assert_eq!(params.author.as_deref(), Some("bob"));
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, MAX_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_fingerprint_distinguishes_filters() {
        let base = ListParams::default();
        let filtered = ListParams {
            status: Some(PostStatus::Draft),
            ..Default::default()
        };
        let second_page = ListParams {
            page: 2,
            ..Default::default()
        };

        assert_ne!(base.fingerprint(), filtered.fingerprint());
        assert_ne!(base.fingerprint(), second_page.fingerprint());
        assert_eq!(base.fingerprint(), ListParams::default().fingerprint());
    }
}
