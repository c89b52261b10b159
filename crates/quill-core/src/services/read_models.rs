//! Read models returned by the services and stored in the read cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Author, Comment, Post, PostStatus};

/// Characters of body text shown in listings.
pub const EXCERPT_CHARS: usize = 100;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty(page: u64, page_size: u64) -> Self {
        Self {
            count: 0,
            page,
            page_size,
            results: Vec::new(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.count
    }
}

/// Listing entry: no body, no comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub author: Author,
    pub status: PostStatus,
    pub pub_date: Option<DateTime<Utc>>,
    pub views_count: u64,
    pub reading_time: u32,
    pub likes: u64,
    pub comments_count: u64,
    pub featured_image: Option<String>,
}

impl PostSummary {
    pub fn build(post: &Post, author: Author, comments_count: u64) -> Self {
        Self {
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt(EXCERPT_CHARS),
            author,
            status: post.status,
            pub_date: post.pub_date,
            views_count: post.views_count,
            reading_time: post.reading_time,
            likes: post.likes,
            comments_count,
            featured_image: post.featured_image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub approved: bool,
}

impl CommentView {
    pub fn build(comment: &Comment, author: Author) -> Self {
        Self {
            id: comment.id,
            content: comment.content.clone(),
            author,
            created_at: comment.created_at,
            approved: comment.approved,
        }
    }
}

/// Full post payload.
///
/// The cached snapshot carries stale counters and viewer flags; they are
/// overwritten for every response by [`PostDetail::overlay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author: Author,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub pub_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub reading_time: u32,
    pub views_count: u64,
    pub likes: u64,
    pub is_liked: bool,
    pub is_author: bool,
    pub featured_image: Option<String>,
    pub comments: Vec<CommentView>,
    pub comments_count: u64,
}

impl PostDetail {
    pub fn build(post: &Post, author: Author, comments: Vec<CommentView>) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            author,
            status: post.status,
            created_at: post.created_at,
            pub_date: post.pub_date,
            updated_at: post.updated_at,
            reading_time: post.reading_time,
            views_count: post.views_count,
            likes: post.likes,
            is_liked: false,
            is_author: false,
            featured_image: post.featured_image.clone(),
            comments_count: comments.len() as u64,
            comments,
        }
    }

    /// Apply per-request values on top of a (possibly cached) snapshot.
    pub fn overlay(mut self, live: LiveCounters, is_liked: bool, is_author: bool) -> Self {
        self.views_count = live.views_count;
        self.likes = live.likes;
        self.is_liked = is_liked;
        self.is_author = is_author;
        self
    }
}

/// Counter values read at response time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveCounters {
    pub views_count: u64,
    pub likes: u64,
}

/// Public user listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

/// User page, including how many public posts they have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub posts_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostDraft;

    fn author() -> Author {
        Author {
            id: Uuid::new_v4(),
            username: "alice".into(),
            bio: String::new(),
            profile_picture: None,
        }
    }

    #[test]
    fn test_overlay_replaces_counters_and_flags() {
        let post = Post::new(Uuid::new_v4(), PostDraft::default());
        let detail = PostDetail::build(&post, author(), vec![]).overlay(
            LiveCounters {
                views_count: 42,
                likes: 3,
            },
            true,
            false,
        );

        assert_eq!(detail.views_count, 42);
        assert_eq!(detail.likes, 3);
        assert!(detail.is_liked);
        assert!(!detail.is_author);
    }

    #[test]
    fn test_page_has_next() {
        let mut page: Page<()> = Page::empty(1, 10);
        page.count = 11;
        assert!(page.has_next());
        page.page = 2;
        assert!(!page.has_next());
    }
}
