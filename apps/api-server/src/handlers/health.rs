//! Health check and API root.

use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cache_strategy: String,
    pub timestamp: String,
}

/// Health check endpoint - returns server status.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache_strategy: format!("{:?}", state.cache_strategy),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

/// GET /api/
pub async fn api_root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "users": "/api/users",
        "posts": "/api/posts",
        "register": "/api/register",
        "token": "/api/token",
    }))
}
