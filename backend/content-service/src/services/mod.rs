/// Business logic layer for content-service
///
/// This module provides high-level operations:
/// - Expiry policy: lifetime validation and expiry stamping
/// - Visibility: read-time expiry and audience predicates
/// - Post service: post creation and time-bounded reads
/// - Story service: story lifecycle, author grouping and the viewer ledger
use crate::error::{AppError, Result};
use validator::ValidationError;

pub mod expiry;
pub mod posts;
pub mod stories;
pub mod visibility;

// Re-export commonly used services
pub use expiry::{ExpiryPolicy, PostDuration};
pub use posts::{NewPost, PostService};
pub use stories::{AuthorStories, NewStory, StoriesService, StoryView, ViewerSummary};
pub use visibility::{AudienceScope, LifecycleState, VisibilityWindow};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Limit/offset window for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::Validation("offset must not be negative".into()));
        }
        Ok(Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset,
        })
    }
}

/// Media must be an absolute http(s) URL handed out by media storage.
pub(crate) fn validate_media_url(url: &str) -> std::result::Result<(), ValidationError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ValidationError::new("media_url_scheme"))
    }
}
