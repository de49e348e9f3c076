/// OpenAPI documentation for Ephora Content Service
use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::handlers::{self, posts, stories};
use crate::middleware::USER_ID_HEADER;
use crate::models::{Audience, MediaType, Post, Story, UserProfile};
use crate::services::{AuthorStories, NewPost, NewStory, StoryView, ViewerSummary};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ephora Content Service API",
        version = "1.0.0",
        description = "Ephemeral posts and stories. Every record carries a server-stamped expiry and disappears from reads once it passes; stories keep a per-user viewer ledger.",
        contact(
            name = "Ephora Team",
            email = "support@ephora.app"
        ),
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8081", description = "Development server"),
    ),
    paths(
        posts::create_post,
        posts::list_posts,
        posts::get_post,
        posts::get_user_posts,
        stories::create_story,
        stories::list_stories,
        stories::get_user_stories,
        stories::get_story,
        stories::mark_story_viewed,
    ),
    components(schemas(
        Post,
        Story,
        MediaType,
        Audience,
        UserProfile,
        NewPost,
        NewStory,
        StoryView,
        ViewerSummary,
        AuthorStories,
        stories::ViewRecorded,
        handlers::ErrorResponse,
    )),
    tags(
        (name = "health", description = "Service health checks"),
        (name = "posts", description = "Posts with a chosen lifetime of 1, 4, 8, 12 or 24 hours"),
        (name = "stories", description = "Ephemeral stories (24-hour lifespan) and their viewers"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "gateway_user",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    USER_ID_HEADER,
                    "Caller id forwarded by the API gateway",
                ))),
            )
        }
    }
}

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/api/v1/openapi.json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_content_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/posts",
            "/api/v1/posts/{post_id}",
            "/api/v1/posts/user/{user_id}",
            "/api/v1/stories",
            "/api/v1/stories/{story_id}",
            "/api/v1/stories/user/{user_id}",
            "/api/v1/stories/{story_id}/views",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
