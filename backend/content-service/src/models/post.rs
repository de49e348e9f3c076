use super::ContentRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub media_url: String,
    pub caption: String,
    pub duration_hours: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Advisory cache of "past expiry". Maintained by the reconcile job only;
    /// visibility is always derived from `expires_at`.
    pub is_expired: bool,
}

impl ContentRecord for Post {
    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}
