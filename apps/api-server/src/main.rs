//! # Quill API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer};
use tracing_actix_web::TracingLogger;

use api_server::config::AppConfig;
use api_server::observability::RequestIdMiddleware;
use api_server::state::AppState;
use api_server::telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Quill API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application state");
        std::io::Error::other(e.to_string())
    })?;

    let configure = api_server::configure_app(state);
    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .configure(configure.clone())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
