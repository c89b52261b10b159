//! Registration and token issue.

use actix_web::{HttpResponse, web};

use quill_core::services::Registration;
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterResponse, RegisterUserRequest};

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let (user, token) = state
        .accounts
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            password_confirm: req.password_confirm,
        })
        .await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        user,
        auth: AuthResponse::bearer(token.access_token, token.expires_in),
    }))
}

/// POST /api/token - unknown user and wrong password both answer 401.
pub async fn token(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let token = state
        .accounts
        .login(&req.username, &req.password)
        .await?;

    Ok(HttpResponse::Ok().json(AuthResponse::bearer(token.access_token, token.expires_in)))
}
