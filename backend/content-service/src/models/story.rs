use super::ContentRecord;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl TryFrom<&str> for MediaType {
    type Error = AppError;
    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            _ => Err(AppError::Validation(format!("invalid media_type '{}'", s))),
        }
    }
}

/// Who may see a story besides its author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    #[default]
    Public,
    Followers,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Public => "public",
            Audience::Followers => "followers",
        }
    }
}

impl TryFrom<&str> for Audience {
    type Error = AppError;
    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "public" => Ok(Audience::Public),
            "followers" => Ok(Audience::Followers),
            _ => Err(AppError::Validation(format!("invalid audience '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Story {
    pub id: Uuid,
    pub author_id: Uuid,
    pub media_url: String,
    pub media_type: MediaType,
    pub audience: Audience,
    pub duration_hours: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ContentRecord for Story {
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

/// One row of a story's viewer ledger. `viewed_at` is the first view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ViewerEntry {
    pub user_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_their_wire_names() {
        assert_eq!(MediaType::try_from("video").unwrap(), MediaType::Video);
        assert_eq!(Audience::try_from("followers").unwrap(), Audience::Followers);
        assert!(matches!(
            Audience::try_from("close_friends"),
            Err(AppError::Validation(_))
        ));
        assert!(MediaType::try_from("gif").is_err());
    }

    #[test]
    fn wire_names_round_trip_through_as_str() {
        for audience in [Audience::Public, Audience::Followers] {
            assert_eq!(Audience::try_from(audience.as_str()).unwrap(), audience);
        }
        assert_eq!(
            serde_json::to_value(MediaType::Image).unwrap(),
            serde_json::json!("image")
        );
    }
}
