//! File storage - local disk and in-memory.

mod local;
mod memory;

pub use local::LocalFileStorage;
pub use memory::InMemoryFileStorage;

use std::path::{Component, Path};

use quill_core::ports::StorageError;

/// Reject anything that could escape the storage root.
pub(crate) fn checked_relative(path: &str) -> Result<&Path, StorageError> {
    let candidate = Path::new(path);
    let escapes = path.is_empty()
        || candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(candidate)
}
