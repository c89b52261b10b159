//! File storage port - featured images, profile pictures and uploads.

use async_trait::async_trait;

/// Opaque blob storage addressed by relative path.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Remove a stored file. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Relative paths of every file under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O failed: {0}")]
    Io(String),
}
