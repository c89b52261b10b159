//! SeaORM entities, one per table.

pub mod comment;
pub mod post;
pub mod post_like;
pub mod profile;
pub mod user;
