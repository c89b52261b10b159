use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Words per minute used for reading time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Lifecycle status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status `{other}`")),
        }
    }
}

/// Post entity - a blog post.
///
/// `views_count` and `likes` are owned by the counter store and are never
/// written by content updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: PostStatus,
    pub pub_date: Option<DateTime<Utc>>,
    pub views_count: u64,
    pub likes: u64,
    pub reading_time: u32,
    pub featured_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post. The slug is assigned by the content service.
    pub fn new(author_id: Uuid, draft: PostDraft) -> Self {
        let now = Utc::now();
        let mut post = Self {
            id: Uuid::new_v4(),
            author_id,
            title: draft.title,
            slug: String::new(),
            content: draft.content,
            status: draft.status,
            pub_date: draft.pub_date,
            views_count: 0,
            likes: 0,
            reading_time: 0,
            featured_image: draft.featured_image,
            created_at: now,
            updated_at: now,
        };
        post.touch(now);
        post
    }

    /// Refresh derived fields before persisting.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.status == PostStatus::Published && self.pub_date.is_none() {
            self.pub_date = Some(now);
        }
        self.reading_time = reading_time(&self.content);
        self.updated_at = now;
    }

    /// Apply an edit. Returns the featured image reference that was replaced,
    /// if any, so the caller can release it.
    pub fn apply(&mut self, patch: PostPatch) -> Option<String> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(pub_date) = patch.pub_date {
            self.pub_date = pub_date;
        }

        let mut replaced = None;
        if let Some(image) = patch.featured_image {
            if self.featured_image != image {
                replaced = std::mem::replace(&mut self.featured_image, image);
            }
        }

        self.touch(Utc::now());
        replaced
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Content with markup stripped, cut to `max_chars` with an ellipsis.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let plain = strip_tags(&self.content);
        if plain.chars().count() > max_chars {
            let cut: String = plain.chars().take(max_chars).collect();
            format!("{cut}...")
        } else {
            plain
        }
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub pub_date: Option<DateTime<Utc>>,
    pub featured_image: Option<String>,
}

/// Partial edit of a post. `None` leaves the field untouched; the nested
/// options on `pub_date` and `featured_image` allow clearing them.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub pub_date: Option<Option<DateTime<Utc>>>,
    pub featured_image: Option<Option<String>>,
}

/// State of a like relation after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: u64,
}

/// `max(1, round(words / 200))`, rounding halves to even.
pub fn reading_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    let minutes = (words as f64 / WORDS_PER_MINUTE as f64).round_ties_even() as u32;
    minutes.max(1)
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
