/// Post handlers - HTTP endpoints for post operations
use super::{ErrorResponse, PaginationParams};
use crate::error::Result;
use crate::middleware::UserId;
use crate::models::Post;
use crate::services::{NewPost, PostService};
use actix_web::{web, HttpResponse};
use uuid::Uuid;

/// Create a new post
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "posts",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Invalid media or duration", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse)
    )
)]
pub async fn create_post(
    service: web::Data<PostService>,
    user_id: UserId,
    req: web::Json<NewPost>,
) -> Result<HttpResponse> {
    let post = service.create_post(user_id.0, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

/// List visible posts, newest first
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "posts",
    params(PaginationParams),
    responses(
        (status = 200, description = "Visible posts", body = [Post]),
        (status = 400, description = "Malformed pagination", body = ErrorResponse)
    )
)]
pub async fn list_posts(
    service: web::Data<PostService>,
    _user_id: UserId,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let posts = service.list_posts(query.page()?).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// Get a post by ID
#[utoipa::path(
    get,
    path = "/api/v1/posts/{post_id}",
    tag = "posts",
    params(("post_id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Visible post", body = Post),
        (status = 404, description = "Unknown or expired post", body = ErrorResponse)
    )
)]
pub async fn get_post(
    service: web::Data<PostService>,
    _user_id: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = service.get_post(*post_id).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Get posts for a user
#[utoipa::path(
    get,
    path = "/api/v1/posts/user/{user_id}",
    tag = "posts",
    params(("user_id" = Uuid, Path, description = "Author id"), PaginationParams),
    responses(
        (status = 200, description = "The author's visible posts", body = [Post]),
        (status = 400, description = "Malformed pagination", body = ErrorResponse)
    )
)]
pub async fn get_user_posts(
    service: web::Data<PostService>,
    _user_id: UserId,
    author_id: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let posts = service
        .list_user_posts(author_id.into_inner(), query.page()?)
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}
