/// Story handlers - HTTP endpoints for story operations
use super::ErrorResponse;
use crate::error::Result;
use crate::middleware::UserId;
use crate::models::Story;
use crate::services::{AuthorStories, NewStory, StoriesService, StoryView};
use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ViewRecorded {
    pub success: bool,
}

/// Create a new story
#[utoipa::path(
    post,
    path = "/api/v1/stories",
    tag = "stories",
    request_body = NewStory,
    responses(
        (status = 201, description = "Story created", body = Story),
        (status = 400, description = "Invalid media, media type or audience", body = ErrorResponse)
    )
)]
pub async fn create_story(
    service: web::Data<StoriesService>,
    user_id: UserId,
    req: web::Json<NewStory>,
) -> Result<HttpResponse> {
    let story = service.create_story(user_id.0, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(story))
}

/// Visible stories grouped by author
#[utoipa::path(
    get,
    path = "/api/v1/stories",
    tag = "stories",
    responses(
        (status = 200, description = "One bucket per author, most recent author first", body = [AuthorStories])
    )
)]
pub async fn list_stories(
    service: web::Data<StoriesService>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let buckets = service.list_all_stories(user_id.0).await?;
    Ok(HttpResponse::Ok().json(buckets))
}

/// Get user's stories
#[utoipa::path(
    get,
    path = "/api/v1/stories/user/{user_id}",
    tag = "stories",
    params(("user_id" = Uuid, Path, description = "Author id")),
    responses(
        (status = 200, description = "The author's visible stories", body = [StoryView])
    )
)]
pub async fn get_user_stories(
    service: web::Data<StoriesService>,
    user_id: UserId,
    author_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let stories = service
        .list_user_stories(author_id.into_inner(), user_id.0)
        .await?;
    Ok(HttpResponse::Ok().json(stories))
}

/// Get a story
#[utoipa::path(
    get,
    path = "/api/v1/stories/{story_id}",
    tag = "stories",
    params(("story_id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "Visible story", body = StoryView),
        (status = 404, description = "Unknown, expired or not visible to the caller", body = ErrorResponse)
    )
)]
pub async fn get_story(
    service: web::Data<StoriesService>,
    user_id: UserId,
    story_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let story = service.get_story(*story_id, user_id.0).await?;
    Ok(HttpResponse::Ok().json(story))
}

/// Track story view
#[utoipa::path(
    post,
    path = "/api/v1/stories/{story_id}/views",
    tag = "stories",
    params(("story_id" = Uuid, Path, description = "Story id")),
    responses(
        (status = 200, description = "View recorded; repeat views are no-ops", body = ViewRecorded),
        (status = 404, description = "Unknown, expired or not visible to the caller", body = ErrorResponse)
    )
)]
pub async fn mark_story_viewed(
    service: web::Data<StoriesService>,
    user_id: UserId,
    story_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    service.mark_viewed(*story_id, user_id.0).await?;
    Ok(HttpResponse::Ok().json(ViewRecorded { success: true }))
}
