/// HTTP handlers for content-related endpoints
///
/// This module contains handlers for:
/// - Posts: create, read and list posts with a chosen lifetime
/// - Stories: create, read and list stories grouped by author, record views
///
/// Every route expects [`GatewayIdentityMiddleware`](crate::middleware::GatewayIdentityMiddleware)
/// to have run; `configure` installs it on the `/api/v1` content scopes.
pub mod posts;
pub mod stories;

use crate::error::AppError;
use crate::middleware::{GatewayIdentityMiddleware, MetricsMiddleware};
use crate::services::Page;
use actix_web::web;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// Re-export handler functions at module level
pub use posts::{create_post, get_post, get_user_posts, list_posts};
pub use stories::{create_story, get_story, get_user_stories, list_stories, mark_story_viewed};

/// Error body produced by [`AppError`].
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

/// Pagination query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page size, clamped to 1..=100 (default 20)
    pub limit: Option<i64>,
    /// Rows to skip (default 0)
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn page(&self) -> crate::error::Result<Page> {
        Page::new(self.limit, self.offset)
    }
}

/// Registers the content routes under `/api/v1`. Service state
/// (`web::Data<PostService>` and `web::Data<StoriesService>`) is expected
/// on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .service(
        web::scope("/api/v1")
            .wrap(GatewayIdentityMiddleware)
            .wrap(MetricsMiddleware)
            .service(
                web::scope("/posts")
                    .service(
                        web::resource("")
                            .route(web::post().to(create_post))
                            .route(web::get().to(list_posts)),
                    )
                    .service(web::resource("/user/{user_id}").route(web::get().to(get_user_posts)))
                    .service(web::resource("/{post_id}").route(web::get().to(get_post))),
            )
            .service(
                web::scope("/stories")
                    .service(
                        web::resource("")
                            .route(web::post().to(create_story))
                            .route(web::get().to(list_stories)),
                    )
                    .service(
                        web::resource("/user/{user_id}").route(web::get().to(get_user_stories)),
                    )
                    .service(web::resource("/{story_id}").route(web::get().to(get_story)))
                    .route("/{story_id}/views", web::post().to(mark_story_viewed)),
            ),
    );
}
