//! Delete uploaded media that no post body references.
//!
//! Reads the same environment as the API server (`DATABASE_URL`,
//! `MEDIA_ROOT`, `MEDIA_URL`) and exits non-zero when the sweep fails.

use std::process::ExitCode;
use std::sync::Arc;

use quill_core::ports::FileStorage;
use quill_core::services::OrphanSweeper;
use quill_infra::LocalFileStorage;

use api_server::config::AppConfig;
use api_server::state::connect_repositories;
use api_server::telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    let repos = match connect_repositories(&config).await {
        Ok(repos) => repos,
        Err(e) => {
            tracing::error!(error = %e, "Cannot reach post storage");
            return ExitCode::FAILURE;
        }
    };

    let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(config.media_root.clone()));
    let sweeper = OrphanSweeper::new(repos.posts, storage, config.media_url.clone());

    match sweeper.sweep().await {
        Ok(report) => {
            tracing::info!(
                scanned = report.scanned,
                referenced = report.referenced,
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "Orphaned file sweep finished"
            );
            if report.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Orphaned file sweep failed");
            ExitCode::FAILURE
        }
    }
}
