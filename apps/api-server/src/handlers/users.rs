//! User listing, user pages and the caller's own profile.

use actix_web::{HttpResponse, web};

use quill_core::services::{DEFAULT_PAGE_SIZE, ProfileUpdate};
use quill_shared::dto::{PageParams, UpdateProfileRequest};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/users
pub async fn list_users(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let users = state.accounts.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/users/{username}
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user = state.accounts.get_user(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /api/users/{username}/posts - the user's public posts.
pub async fn user_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let page = state
        .content
        .list_by_author(
            &path.into_inner(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/users/me
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state.accounts.me(identity.viewer()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// PUT|PATCH /api/users/me
pub async fn update_me(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let user = state
        .accounts
        .update_profile(
            identity.viewer(),
            ProfileUpdate {
                bio: req.bio,
                profile_picture: req.profile_picture,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /api/users/me
pub async fn delete_me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    state.accounts.delete_account(identity.viewer()).await?;
    tracing::info!(user_id = %identity.user_id, "Account removed on request");
    Ok(HttpResponse::NoContent().finish())
}
