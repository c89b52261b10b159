//! Cleanup of uploads no post body refers to.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::DomainError;
use crate::ports::{FileStorage, PostRepository};

/// Directory (relative to the media root) that inline uploads land in.
pub const UPLOADS_DIR: &str = "uploads";

static SRC_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="([^"]+)""#).expect("compile src attribute regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub referenced: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

pub struct OrphanSweeper {
    posts: Arc<dyn PostRepository>,
    storage: Arc<dyn FileStorage>,
    media_url: String,
}

impl OrphanSweeper {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        storage: Arc<dyn FileStorage>,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            posts,
            storage,
            media_url: media_url.into(),
        }
    }

    /// Storage paths referenced from `content` through `src="<media_url>..."`.
    pub fn referenced_paths(&self, content: &str) -> Vec<String> {
        SRC_ATTR
            .captures_iter(content)
            .filter_map(|cap| cap.get(1))
            .filter_map(|m| m.as_str().strip_prefix(self.media_url.as_str()))
            .map(|rest| rest.trim_start_matches('/').to_string())
            .collect()
    }

    pub async fn sweep(&self) -> Result<SweepReport, DomainError> {
        let referenced: HashSet<String> = self
            .posts
            .all_contents()
            .await?
            .iter()
            .flat_map(|content| self.referenced_paths(content))
            .collect();

        let files = self
            .storage
            .list(UPLOADS_DIR)
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut report = SweepReport {
            scanned: files.len(),
            referenced: referenced.len(),
            ..Default::default()
        };

        for path in files {
            if referenced.contains(&path) {
                continue;
            }
            match self.storage.delete(&path).await {
                Ok(()) => {
                    tracing::info!(path = %path, "Deleted orphan file");
                    report.deleted.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to delete orphan file");
                    report.failed.push(path);
                }
            }
        }

        Ok(report)
    }
}
