//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod counters;
mod repository;
mod storage;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use cache::{Cache, CacheCapabilities, CacheError};
pub use counters::CounterStore;
pub use repository::{
    BaseRepository, CommentRepository, PostOrderField, PostOrdering, PostQuery, PostRepository,
    PostSearch, ProfileRepository, UserRepository,
};
pub use storage::{FileStorage, StorageError};
