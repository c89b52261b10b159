//! Posts, likes and comments.

use actix_web::{HttpResponse, web};

use quill_core::domain::{PostDraft, PostPatch, PostStatus};
use quill_core::ports::PostOrdering;
use quill_core::services::{DEFAULT_PAGE_SIZE, ListParams};
use quill_shared::dto::{
    CreateCommentRequest, CreatePostRequest, LikeResponse, ListPostsParams, UpdatePostRequest,
};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn parse_status(raw: &str) -> Result<PostStatus, AppError> {
    raw.parse().map_err(|_| {
        AppError::invalid(
            "status",
            format!("\"{raw}\" is not a valid choice. Choose draft or published."),
        )
    })
}

fn list_params(query: ListPostsParams) -> Result<ListParams, AppError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;

    // An unrecognised ordering falls back to the default.
    let ordering = query
        .ordering
        .as_deref()
        .and_then(PostOrdering::parse)
        .unwrap_or_default();

    Ok(ListParams {
        status,
        author: query.author,
        search: query.search,
        ordering,
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    })
}

/// GET /api/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<ListPostsParams>,
) -> AppResult<HttpResponse> {
    let params = list_params(query.into_inner())?;
    let page = state.content.list_visible(identity.viewer(), params).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let status = match req.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => PostStatus::default(),
    };

    let detail = state
        .content
        .create(
            identity.viewer(),
            PostDraft {
                title: req.title,
                content: req.content,
                status,
                pub_date: req.pub_date,
                featured_image: req.featured_image,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(detail))
}

/// GET /api/posts/{slug} - counts a view.
pub async fn get_post(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let detail = state
        .content
        .read_detail(&path.into_inner(), identity.viewer())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// PUT|PATCH /api/posts/{slug}
pub async fn update_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let status = req.status.as_deref().map(parse_status).transpose()?;

    let detail = state
        .content
        .update(
            &path.into_inner(),
            identity.viewer(),
            PostPatch {
                title: req.title,
                content: req.content,
                status,
                pub_date: req.pub_date,
                featured_image: req.featured_image,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// DELETE /api/posts/{slug}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state
        .content
        .delete(&path.into_inner(), identity.viewer())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{slug}/like - toggles the caller's like.
pub async fn like_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let like = state
        .content
        .toggle_like(&path.into_inner(), identity.viewer())
        .await?;
    Ok(HttpResponse::Ok().json(LikeResponse {
        liked: like.liked,
        likes_count: like.likes_count,
    }))
}

/// GET /api/posts/{slug}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let comments = state
        .content
        .list_comments(&path.into_inner(), identity.viewer())
        .await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /api/posts/{slug}/comments
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .content
        .add_comment(
            &path.into_inner(),
            identity.viewer(),
            body.into_inner().content,
        )
        .await?;
    Ok(HttpResponse::Created().json(comment))
}
