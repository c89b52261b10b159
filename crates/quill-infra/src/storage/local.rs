//! Media files on local disk, under a configured root.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use quill_core::ports::{FileStorage, StorageError};

use super::checked_relative;

pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full = self.root.join(checked_relative(path)?);

        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                tracing::debug!(path = %path, "Removed stored file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let base = checked_relative(prefix)?.to_path_buf();
        let mut pending = vec![base];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(self.root.join(&dir)).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e.to_string())),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?
            {
                let relative = dir.join(entry.file_name());
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::Io(e.to_string()))?;

                if file_type.is_dir() {
                    pending.push(relative);
                } else if file_type.is_file() {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(parts.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
