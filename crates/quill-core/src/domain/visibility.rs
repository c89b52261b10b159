//! Who may see which post.
//!
//! A post is public once it is `published` with a publish date that has
//! passed. Its author sees it regardless. List queries and single-item
//! retrieval both go through [`VisibilityPolicy`] (or the equivalent
//! [`VisibilityFilter`] pushed down to storage), so they cannot disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::post::{Post, PostStatus};

/// The identity a request acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(Uuid),
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }
}

impl From<Option<Uuid>> for Viewer {
    fn from(user_id: Option<Uuid>) -> Self {
        user_id.map(Viewer::User).unwrap_or(Viewer::Anonymous)
    }
}

/// Pure visibility decisions.
pub struct VisibilityPolicy;

impl VisibilityPolicy {
    /// Published with a publish date at or before `now`.
    pub fn is_public(status: PostStatus, pub_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        status == PostStatus::Published && pub_date.is_some_and(|date| date <= now)
    }

    pub fn is_visible(post: &Post, viewer: Viewer, now: DateTime<Utc>) -> bool {
        if viewer.user_id() == Some(post.author_id) {
            return true;
        }
        Self::is_public(post.status, post.pub_date, now)
    }

    /// The storage-level form of the same rule.
    pub fn filter(viewer: Viewer, now: DateTime<Utc>) -> VisibilityFilter {
        VisibilityFilter {
            viewer: viewer.user_id(),
            now,
        }
    }
}

/// Visibility predicate handed to repositories:
/// `(status = published AND pub_date <= now) OR author_id = viewer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityFilter {
    pub viewer: Option<Uuid>,
    pub now: DateTime<Utc>,
}

impl VisibilityFilter {
    /// Only what anonymous readers may see.
    pub fn public(now: DateTime<Utc>) -> Self {
        Self { viewer: None, now }
    }

    pub fn matches(&self, post: &Post) -> bool {
        VisibilityPolicy::is_visible(post, Viewer::from(self.viewer), self.now)
    }
}
