//! # Quill Core
//!
//! The domain layer of the Quill blog backend: posts and their visibility
//! rules, view/like counters, the read cache and the services built on them.
//! Infrastructure is reached only through the traits in [`ports`].

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError, ValidationErrors};
