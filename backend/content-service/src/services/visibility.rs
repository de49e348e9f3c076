//! Read-time visibility filter.
//!
//! Every read path builds a [`VisibilityWindow`] from the clock at the moment
//! of the read and composes it into its query, either as an in-process
//! predicate or as a SQL fragment. A record turns invisible exactly when the
//! read time reaches its `expires_at`; no event or stored state drives it.

use crate::models::{Audience, ContentRecord, Story};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityWindow {
    now: DateTime<Utc>,
}

impl VisibilityWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// A missing `expires_at` means the record never expires.
    pub fn admits_expiry(&self, expires_at: Option<DateTime<Utc>>) -> bool {
        match expires_at {
            Some(at) => self.now < at,
            None => true,
        }
    }

    pub fn admits<R: ContentRecord + ?Sized>(&self, record: &R) -> bool {
        self.admits_expiry(record.expires_at())
    }

    pub fn state<R: ContentRecord + ?Sized>(&self, record: &R) -> LifecycleState {
        if self.admits(record) {
            LifecycleState::Active
        } else {
            LifecycleState::Expired
        }
    }

    /// Appends `(<column> IS NULL OR <column> > $now)`.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        qb.push("(")
            .push(column)
            .push(" IS NULL OR ")
            .push(column)
            .push(" > ")
            .push_bind(self.now)
            .push(")");
    }
}

/// Follower gating for stories, evaluated for one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudienceScope {
    viewer_id: Uuid,
}

impl AudienceScope {
    pub fn for_viewer(viewer_id: Uuid) -> Self {
        Self { viewer_id }
    }

    pub fn viewer_id(&self) -> Uuid {
        self.viewer_id
    }

    pub fn admits(&self, story: &Story, viewer_follows_author: bool) -> bool {
        match story.audience {
            Audience::Public => true,
            Audience::Followers => story.author_id == self.viewer_id || viewer_follows_author,
        }
    }

    /// Appends the SQL equivalent of [`AudienceScope::admits`] for the
    /// stories table aliased as `alias`.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        qb.push("(")
            .push(alias)
            .push(".audience = 'public' OR ")
            .push(alias)
            .push(".author_id = ")
            .push_bind(self.viewer_id)
            .push(" OR EXISTS (SELECT 1 FROM follows f WHERE f.follower_id = ")
            .push_bind(self.viewer_id)
            .push(" AND f.following_id = ")
            .push(alias)
            .push(".author_id))");
    }
}
