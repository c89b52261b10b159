//! # Quill API Server
//!
//! Actix-web boundary over the Quill services. The binaries in this package
//! (`api-server`, `remove-orphaned-files`) are thin wrappers around it.

use actix_web::web;

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod state;
pub mod telemetry;

use middleware::error::AppError;
use state::AppState;

/// Register shared state, extractor configuration and routes.
pub fn configure_app(state: AppState) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(state.tokens.clone()))
            .app_data(web::Data::new(state.clone()))
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
            )
            .app_data(
                web::QueryConfig::default()
                    .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
            )
            .configure(handlers::configure_routes);
    }
}
