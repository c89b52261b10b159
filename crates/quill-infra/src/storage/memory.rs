//! In-memory file storage - used when no media root is configured, and by tests.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::ports::{FileStorage, StorageError};

use super::checked_relative;

/// Tracks which paths exist. Holds no file contents.
#[derive(Default)]
pub struct InMemoryFileStorage {
    files: RwLock<BTreeSet<String>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored file.
    pub async fn put(&self, path: &str) -> Result<(), StorageError> {
        checked_relative(path)?;
        self.files.write().await.insert(path.to_string());
        Ok(())
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.files.read().await.contains(path)
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        checked_relative(path)?;
        self.files.write().await.remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        Ok(self
            .files
            .read()
            .await
            .iter()
            .filter(|path| path.starts_with(&dir))
            .cloned()
            .collect())
    }
}
