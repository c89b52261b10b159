use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Post, PostStatus, Profile, User, VisibilityFilter};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;

    /// IDs of users whose username contains `term`, case-insensitively.
    async fn search_ids(&self, term: &str) -> Result<Vec<Uuid>, RepoError>;

    async fn list(&self) -> Result<Vec<User>, RepoError>;
}

/// Profiles are keyed by their user's ID.
#[async_trait]
pub trait ProfileRepository: BaseRepository<Profile, Uuid> {
    async fn find_by_user_ids(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Approved comments on a post, newest first.
    async fn list_approved(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    /// Approved comment counts, one entry per post that has any.
    async fn count_approved(&self, post_ids: &[Uuid]) -> Result<Vec<(Uuid, u64)>, RepoError>;
}

/// Post repository.
///
/// Content writes go through `insert`/`update`; `update` never touches
/// `views_count` or `likes`, which belong to the counter store.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError>;

    /// Insert a new post. A slug collision is reported as `RepoError::Constraint`.
    async fn insert(&self, post: Post) -> Result<Post, RepoError>;

    /// Persist the editable fields of a post.
    async fn update(&self, post: &Post) -> Result<Post, RepoError>;

    /// Delete a post together with its comments and likes.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// One page of posts matching `query`, plus the total match count.
    async fn list(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), RepoError>;

    async fn count_visible_by_author(
        &self,
        author_id: Uuid,
        visibility: VisibilityFilter,
    ) -> Result<u64, RepoError>;

    /// Bodies of every post, for upload reference scans.
    async fn all_contents(&self) -> Result<Vec<String>, RepoError>;

    /// Whether any post has `path` as its featured image.
    async fn image_in_use(&self, path: &str) -> Result<bool, RepoError>;
}

/// Sortable post columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrderField {
    #[default]
    PubDate,
    ViewsCount,
    Likes,
    ReadingTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostOrdering {
    pub field: PostOrderField,
    pub descending: bool,
}

impl Default for PostOrdering {
    fn default() -> Self {
        Self {
            field: PostOrderField::PubDate,
            descending: true,
        }
    }
}

impl PostOrdering {
    /// Parse `pub_date`, `-views_count`, ... Unknown fields yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "pub_date" => PostOrderField::PubDate,
            "views_count" => PostOrderField::ViewsCount,
            "likes" => PostOrderField::Likes,
            "reading_time" => PostOrderField::ReadingTime,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    pub fn as_param(&self) -> String {
        let name = match self.field {
            PostOrderField::PubDate => "pub_date",
            PostOrderField::ViewsCount => "views_count",
            PostOrderField::Likes => "likes",
            PostOrderField::ReadingTime => "reading_time",
        };
        if self.descending {
            format!("-{name}")
        } else {
            name.to_string()
        }
    }
}

/// Free-text search over title and content, plus posts by matching authors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSearch {
    pub term: String,
    pub author_ids: Vec<Uuid>,
}

/// A resolved post listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub visibility: VisibilityFilter,
    pub status: Option<PostStatus>,
    pub author_id: Option<Uuid>,
    pub search: Option<PostSearch>,
    pub ordering: PostOrdering,
    pub offset: u64,
    pub limit: u64,
}

impl PostQuery {
    pub fn new(visibility: VisibilityFilter) -> Self {
        Self {
            visibility,
            status: None,
            author_id: None,
            search: None,
            ordering: PostOrdering::default(),
            offset: 0,
            limit: u64::MAX,
        }
    }

    /// Whether `post` satisfies every predicate (visibility included).
    /// In-memory stores use this directly; SQL stores mirror it.
    pub fn matches(&self, post: &Post) -> bool {
        if !self.visibility.matches(post) {
            return false;
        }
        if self.status.is_some_and(|status| post.status != status) {
            return false;
        }
        if self.author_id.is_some_and(|id| post.author_id != id) {
            return false;
        }
        if let Some(search) = &self.search {
            let term = search.term.to_lowercase();
            let hit = post.title.to_lowercase().contains(&term)
                || post.content.to_lowercase().contains(&term)
                || search.author_ids.contains(&post.author_id);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Sort posts by this query's ordering. Missing publish dates sort last
    /// when descending, first when ascending.
    pub fn sort(&self, posts: &mut [Post]) {
        let ordering = self.ordering;
        posts.sort_by(|a, b| {
            let ord = match ordering.field {
                PostOrderField::PubDate => a.pub_date.cmp(&b.pub_date),
                PostOrderField::ViewsCount => a.views_count.cmp(&b.views_count),
                PostOrderField::Likes => a.likes.cmp(&b.likes),
                PostOrderField::ReadingTime => a.reading_time.cmp(&b.reading_time),
            };
            let ord = if ordering.descending { ord.reverse() } else { ord };
            ord.then_with(|| b.created_at.cmp(&a.created_at))
        });
    }
}
