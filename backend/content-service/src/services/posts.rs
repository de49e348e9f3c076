/// Post service - post creation and time-bounded retrieval
use super::expiry::{expires_at, ExpiryPolicy};
use super::visibility::VisibilityWindow;
use super::{validate_media_url, Page};
use crate::clock::Clock;
use crate::db::{ContentStore, PostQuery};
use crate::error::{AppError, Result};
use crate::metrics::lifecycle as metrics;
use crate::models::Post;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Client input for a new post. Timestamps are never accepted from clients.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewPost {
    #[serde(default)]
    #[validate(url, custom(function = "validate_media_url"))]
    pub media_url: String,
    #[validate(length(max = 2200))]
    pub caption: Option<String>,
    pub duration_hours: u32,
}

pub struct PostService {
    store: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
}

impl PostService {
    pub fn new(store: Arc<dyn ContentStore>, clock: Arc<dyn Clock>, policy: ExpiryPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    fn window(&self) -> VisibilityWindow {
        VisibilityWindow::at(self.clock.now())
    }

    /// Create a new post
    pub async fn create_post(&self, author_id: Uuid, input: NewPost) -> Result<Post> {
        input.validate()?;
        let duration = self.policy.post_duration(input.duration_hours)?;

        let created_at = self.clock.now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            media_url: input.media_url,
            caption: input.caption.unwrap_or_default(),
            duration_hours: duration.hours(),
            created_at,
            expires_at: Some(expires_at(created_at, duration.hours())?),
            is_expired: false,
        };

        self.store.insert_post(&post).await?;
        metrics::record_content_created("post");
        tracing::info!(
            post_id = %post.id,
            author_id = %author_id,
            duration_hours = post.duration_hours,
            "post created"
        );

        Ok(post)
    }

    /// Get a post by ID; expired posts are reported as missing
    pub async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        let post = self
            .store
            .find_post(post_id, self.window())
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))?;
        audit_cached_flags(std::slice::from_ref(&post));
        Ok(post)
    }

    /// Visible posts from every author, newest first
    pub async fn list_posts(&self, page: Page) -> Result<Vec<Post>> {
        self.query(None, page).await
    }

    /// Visible posts by one author, newest first
    pub async fn list_user_posts(&self, author_id: Uuid, page: Page) -> Result<Vec<Post>> {
        self.query(Some(author_id), page).await
    }

    async fn query(&self, author_id: Option<Uuid>, page: Page) -> Result<Vec<Post>> {
        let query = PostQuery {
            window: self.window(),
            author_id,
            limit: page.limit,
            offset: page.offset,
        };
        let posts = self.store.list_posts(&query).await?;
        audit_cached_flags(&posts);
        Ok(posts)
    }
}

/// Everything a read returns is time-visible, so a set flag means the cache
/// was written early. Logged, never acted on.
fn audit_cached_flags(posts: &[Post]) {
    for post in posts.iter().filter(|p| p.is_expired) {
        metrics::record_flag_drift("read");
        tracing::warn!(
            post_id = %post.id,
            expires_at = ?post.expires_at,
            "post flagged expired before its expiry time; serving by expires_at"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::{InMemoryContentStore, MockContentStore};
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Arc<InMemoryContentStore>, Arc<ManualClock>, PostService) {
        let store = Arc::new(InMemoryContentStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap(),
        ));
        let service = PostService::new(store.clone(), clock.clone(), ExpiryPolicy::default());
        (store, clock, service)
    }

    fn new_post(hours: u32) -> NewPost {
        NewPost {
            media_url: "https://cdn.ephora.app/p/1.jpg".into(),
            caption: Some("sunset".into()),
            duration_hours: hours,
        }
    }

    #[tokio::test]
    async fn create_stamps_expiry_from_server_clock() {
        let (_, clock, service) = setup();
        let post = service.create_post(Uuid::new_v4(), new_post(4)).await.unwrap();

        assert_eq!(post.created_at, clock.now());
        assert_eq!(post.expires_at, Some(clock.now() + Duration::hours(4)));
        assert_eq!(post.duration_hours, 4);
        assert!(!post.is_expired);
    }

    #[tokio::test]
    async fn disallowed_duration_creates_nothing() {
        let (store, _, service) = setup();
        let err = service
            .create_post(Uuid::new_v4(), new_post(2))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.post_count(), 0);
    }

    #[tokio::test]
    async fn missing_media_is_a_validation_error() {
        let (store, _, service) = setup();
        let input = NewPost {
            media_url: String::new(),
            ..new_post(1)
        };
        let err = service.create_post(Uuid::new_v4(), input).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.post_count(), 0);
    }

    #[tokio::test]
    async fn posts_disappear_when_read_time_reaches_expiry() {
        let (_, clock, service) = setup();
        let author = Uuid::new_v4();
        let short = service.create_post(author, new_post(1)).await.unwrap();
        clock.advance(Duration::minutes(1));
        let long = service.create_post(author, new_post(24)).await.unwrap();

        let ids: Vec<Uuid> = service
            .list_user_posts(author, Page::default())
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![long.id, short.id]);

        clock.set(short.expires_at.unwrap());
        let ids: Vec<Uuid> = service
            .list_posts(Page::default())
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![long.id]);

        assert!(matches!(
            service.get_post(short.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(service.get_post(long.id).await.unwrap().id, long.id);
    }

    #[tokio::test]
    async fn cached_flag_does_not_gate_visibility() {
        let (store, clock, service) = setup();
        let mut post = service.create_post(Uuid::new_v4(), new_post(8)).await.unwrap();

        // Flagged early: still served until expires_at.
        post.is_expired = true;
        store.insert_post(&post).await.unwrap();
        assert_eq!(service.get_post(post.id).await.unwrap().id, post.id);

        // Past expiry but never flagged: hidden anyway.
        post.is_expired = false;
        store.insert_post(&post).await.unwrap();
        clock.advance(Duration::hours(8));
        assert!(service.list_posts(Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let (_, clock, service) = setup();
        let author = Uuid::new_v4();
        let mut created = Vec::new();
        for _ in 0..5 {
            created.push(service.create_post(author, new_post(12)).await.unwrap().id);
            clock.advance(Duration::seconds(10));
        }
        created.reverse();

        let page = Page::new(Some(2), Some(1)).unwrap();
        let ids: Vec<Uuid> = service
            .list_posts(page)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, created[1..3].to_vec());
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_storage_error() {
        let mut store = MockContentStore::new();
        store
            .expect_insert_post()
            .returning(|_| Err(AppError::Storage("connection reset".into())));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = PostService::new(Arc::new(store), clock, ExpiryPolicy::default());

        let err = service
            .create_post(Uuid::new_v4(), new_post(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
