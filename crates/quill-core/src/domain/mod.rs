//! Domain entities - the core business objects.

mod comment;
mod post;
pub mod slug;
mod user;
mod visibility;

pub use comment::Comment;
pub use post::{LikeState, Post, PostDraft, PostPatch, PostStatus, WORDS_PER_MINUTE, reading_time};
pub use user::{Author, Profile, User};
pub use visibility::{Viewer, VisibilityFilter, VisibilityPolicy};
