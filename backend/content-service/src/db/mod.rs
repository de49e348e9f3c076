/// Storage layer for content-service
///
/// [`ContentStore`] is the seam between the lifecycle services and the
/// persistence engine. Every read takes the caller's [`VisibilityWindow`]
/// so expiry filtering happens inside the query, never after it.
use crate::error::Result;
use crate::models::{Post, Story, UserProfile, ViewerEntry};
use crate::services::visibility::{AudienceScope, VisibilityWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

pub mod memory;
pub mod pg;

pub use memory::InMemoryContentStore;
pub use pg::PgContentStore;

/// Post listing request, already paired with the read-time window.
#[derive(Debug, Clone)]
pub struct PostQuery {
    pub window: VisibilityWindow,
    pub author_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Story listing request, already paired with the read-time window and the
/// viewer's audience scope.
#[derive(Debug, Clone)]
pub struct StoryQuery {
    pub window: VisibilityWindow,
    pub scope: AudienceScope,
    pub author_id: Option<Uuid>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert_post(&self, post: &Post) -> Result<()>;

    async fn insert_story(&self, story: &Story) -> Result<()>;

    async fn find_post(&self, post_id: Uuid, window: VisibilityWindow) -> Result<Option<Post>>;

    /// Visible posts, newest first.
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;

    async fn find_story(
        &self,
        story_id: Uuid,
        window: VisibilityWindow,
        scope: AudienceScope,
    ) -> Result<Option<Story>>;

    /// Visible stories, newest first.
    async fn list_stories(&self, query: &StoryQuery) -> Result<Vec<Story>>;

    /// Inserts the entry unless the (story, user) pair already exists.
    /// Returns whether a new entry was written.
    async fn append_viewer(&self, story_id: Uuid, entry: &ViewerEntry) -> Result<bool>;

    /// Viewer ledgers keyed by story, each ordered by first view.
    async fn list_viewers(&self, story_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ViewerEntry>>>;

    async fn find_profiles(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserProfile>>;

    /// Sets the advisory `is_expired` flag on posts past expiry at `now`.
    async fn flag_expired_posts(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Posts flagged expired that are still time-visible at `now`.
    async fn count_premature_flags(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Round trip used by the readiness endpoint.
    async fn ping(&self) -> Result<()>;
}
