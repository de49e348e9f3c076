//! Expiry policy: turns a creation time and a lifetime into an absolute
//! `expires_at`, and decides which post lifetimes a client may pick.

use crate::config::LifecycleConfig;
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};

/// Post lifetimes offered to clients, in hours.
pub const DEFAULT_POST_DURATIONS: [u32; 5] = [1, 4, 8, 12, 24];

/// Story lifetime in hours.
pub const DEFAULT_STORY_HOURS: u32 = 24;

/// Longest lifetime configuration may grant to either kind of content (one year).
pub const MAX_LIFETIME_HOURS: u32 = 8760;

/// A post lifetime that passed validation against the allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostDuration(u32);

impl PostDuration {
    pub fn hours(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    allowed_post_hours: Vec<u32>,
    story_hours: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            allowed_post_hours: DEFAULT_POST_DURATIONS.to_vec(),
            story_hours: DEFAULT_STORY_HOURS,
        }
    }
}

impl From<&LifecycleConfig> for ExpiryPolicy {
    fn from(cfg: &LifecycleConfig) -> Self {
        Self {
            allowed_post_hours: cfg.allowed_post_durations.clone(),
            story_hours: cfg.story_lifetime_hours,
        }
    }
}

impl ExpiryPolicy {
    pub fn allowed_post_hours(&self) -> &[u32] {
        &self.allowed_post_hours
    }

    /// Rejects anything outside the allowed set; never rounds to a neighbour.
    pub fn post_duration(&self, hours: u32) -> Result<PostDuration> {
        if self.allowed_post_hours.contains(&hours) {
            Ok(PostDuration(hours))
        } else {
            Err(AppError::Validation(format!(
                "duration_hours {} is not one of {:?}",
                hours, self.allowed_post_hours
            )))
        }
    }

    pub fn story_duration(&self) -> u32 {
        self.story_hours
    }
}

pub fn expires_at(created_at: DateTime<Utc>, hours: u32) -> Result<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours))
        .and_then(|lifetime| created_at.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AppError::Internal(format!(
                "lifetime of {} hours from {} overflows the expiry timestamp",
                hours, created_at
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiry_is_creation_plus_duration() {
        let created = Utc.with_ymd_and_hms(2024, 12, 31, 22, 15, 7).unwrap();
        for hours in DEFAULT_POST_DURATIONS {
            let expiry = expires_at(created, hours).unwrap();
            assert_eq!(expiry - created, Duration::hours(hours as i64));
        }
        assert_eq!(
            expires_at(created, 24).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 22, 15, 7).unwrap()
        );
    }

    #[test]
    fn overflowing_expiry_is_an_error() {
        assert!(matches!(
            expires_at(DateTime::<Utc>::MAX_UTC, 1),
            Err(AppError::Internal(_))
        ));
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(expires_at(created, MAX_LIFETIME_HOURS).is_ok());
        assert!(expires_at(created, u32::MAX).is_err());
    }

    #[test]
    fn allowed_durations_are_accepted() {
        let policy = ExpiryPolicy::default();
        for hours in [1, 4, 8, 12, 24] {
            assert_eq!(policy.post_duration(hours).unwrap().hours(), hours);
        }
    }

    #[test]
    fn other_durations_are_rejected_not_clamped() {
        let policy = ExpiryPolicy::default();
        for hours in [0, 2, 3, 23, 25, 48] {
            assert!(
                matches!(policy.post_duration(hours), Err(AppError::Validation(_))),
                "{} should be rejected",
                hours
            );
        }
    }

    #[test]
    fn policy_follows_lifecycle_config() {
        let cfg = LifecycleConfig {
            story_lifetime_hours: 12,
            allowed_post_durations: vec![6],
            ..LifecycleConfig::default()
        };
        let policy = ExpiryPolicy::from(&cfg);
        assert_eq!(policy.story_duration(), 12);
        assert!(policy.post_duration(6).is_ok());
        assert!(policy.post_duration(24).is_err());
    }
}
