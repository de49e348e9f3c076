/// Data models for content-service
///
/// This module defines structures for:
/// - Post: feed posts with a client-selected lifetime
/// - Story: 24-hour visual content with a viewer ledger
/// - UserProfile: public author fields used when grouping stories
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod post;
pub mod story;
pub mod user;

pub use post::Post;
pub use story::{Audience, MediaType, Story, ViewerEntry};
pub use user::UserProfile;

/// What ordering and the visibility window need from any piece of ephemeral content.
pub trait ContentRecord {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    /// `None` only for rows written before expiry stamping existed.
    fn expires_at(&self) -> Option<DateTime<Utc>>;
}
