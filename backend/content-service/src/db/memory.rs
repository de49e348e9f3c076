//! In-process [`ContentStore`] used by tests and `STORAGE_BACKEND=memory`
//! local runs. Applies the same visibility and audience predicates as the
//! SQL store, evaluated in Rust.

use super::{ContentStore, PostQuery, StoryQuery};
use crate::error::{AppError, Result};
use crate::models::{ContentRecord, Post, Story, UserProfile, ViewerEntry};
use crate::services::visibility::{AudienceScope, VisibilityWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    posts: DashMap<Uuid, Post>,
    stories: DashMap<Uuid, Story>,
    viewers: DashMap<Uuid, Vec<ViewerEntry>>,
    profiles: DashMap<Uuid, UserProfile>,
    /// follower -> accounts they follow
    follows: DashMap<Uuid, HashSet<Uuid>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_profile(&self, profile: UserProfile) {
        self.profiles.insert(profile.user_id, profile);
    }

    pub fn follow(&self, follower_id: Uuid, following_id: Uuid) {
        self.follows
            .entry(follower_id)
            .or_default()
            .insert(following_id);
    }

    fn follows(&self, follower_id: Uuid, following_id: Uuid) -> bool {
        self.follows
            .get(&follower_id)
            .map(|set| set.contains(&following_id))
            .unwrap_or(false)
    }

    fn story_admitted(&self, story: &Story, window: VisibilityWindow, scope: AudienceScope) -> bool {
        window.admits(story)
            && scope.admits(story, self.follows(scope.viewer_id(), story.author_id))
    }

    /// Total stored posts, including expired ones.
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Total stored stories, including expired ones.
    pub fn story_count(&self) -> usize {
        self.stories.len()
    }
}

fn newest_first<R: ContentRecord>(records: &mut [R]) {
    records.sort_by_key(|r| Reverse((r.created_at(), r.id())));
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn insert_post(&self, post: &Post) -> Result<()> {
        self.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn insert_story(&self, story: &Story) -> Result<()> {
        self.stories.insert(story.id, story.clone());
        Ok(())
    }

    async fn find_post(&self, post_id: Uuid, window: VisibilityWindow) -> Result<Option<Post>> {
        Ok(self
            .posts
            .get(&post_id)
            .filter(|p| window.admits(p.value()))
            .map(|p| p.value().clone()))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| query.window.admits(p.value()))
            .filter(|p| query.author_id.map_or(true, |a| p.author_id == a))
            .map(|p| p.value().clone())
            .collect();
        newest_first(&mut posts);

        Ok(posts
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn find_story(
        &self,
        story_id: Uuid,
        window: VisibilityWindow,
        scope: AudienceScope,
    ) -> Result<Option<Story>> {
        let story = self.stories.get(&story_id).map(|s| s.value().clone());
        Ok(story.filter(|s| self.story_admitted(s, window, scope)))
    }

    async fn list_stories(&self, query: &StoryQuery) -> Result<Vec<Story>> {
        let candidates: Vec<Story> = self
            .stories
            .iter()
            .filter(|s| query.author_id.map_or(true, |a| s.author_id == a))
            .map(|s| s.value().clone())
            .collect();

        let mut stories: Vec<Story> = candidates
            .into_iter()
            .filter(|s| self.story_admitted(s, query.window, query.scope))
            .collect();
        newest_first(&mut stories);
        Ok(stories)
    }

    async fn append_viewer(&self, story_id: Uuid, entry: &ViewerEntry) -> Result<bool> {
        if !self.stories.contains_key(&story_id) {
            return Err(AppError::not_found("story", story_id));
        }

        // The entry guard holds the shard lock across check and insert.
        let mut ledger = self.viewers.entry(story_id).or_default();
        if ledger.iter().any(|v| v.user_id == entry.user_id) {
            return Ok(false);
        }
        ledger.push(entry.clone());
        Ok(true)
    }

    async fn list_viewers(&self, story_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ViewerEntry>>> {
        Ok(story_ids
            .iter()
            .filter_map(|id| self.viewers.get(id).map(|v| (*id, v.value().clone())))
            .collect())
    }

    async fn find_profiles(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserProfile>> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| (*id, p.value().clone())))
            .collect())
    }

    async fn flag_expired_posts(&self, now: DateTime<Utc>) -> Result<u64> {
        let window = VisibilityWindow::at(now);
        let mut flagged = 0;
        for mut post in self.posts.iter_mut() {
            if !post.is_expired && !window.admits(post.value()) {
                post.is_expired = true;
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    async fn count_premature_flags(&self, now: DateTime<Utc>) -> Result<u64> {
        let window = VisibilityWindow::at(now);
        Ok(self
            .posts
            .iter()
            .filter(|p| p.is_expired && window.admits(p.value()))
            .count() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn post(created_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            media_url: "https://cdn.ephora.app/p/m.jpg".into(),
            caption: String::new(),
            duration_hours: 1,
            created_at,
            expires_at,
            is_expired: false,
        }
    }

    #[tokio::test]
    async fn lists_newest_first_with_id_tiebreak_inside_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let store = InMemoryContentStore::new();

        let older = post(t0, Some(t0 + Duration::hours(1)));
        let tied_a = post(t0 + Duration::minutes(5), None);
        let tied_b = post(t0 + Duration::minutes(5), Some(t0 + Duration::hours(4)));
        let gone = post(t0, Some(t0 + Duration::minutes(10)));
        for p in [&older, &tied_a, &tied_b, &gone] {
            store.insert_post(p).await.unwrap();
        }

        let listed = store
            .list_posts(&PostQuery {
                window: VisibilityWindow::at(t0 + Duration::minutes(10)),
                author_id: None,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();

        let (first, second) = if tied_a.id > tied_b.id {
            (tied_a.id, tied_b.id)
        } else {
            (tied_b.id, tied_a.id)
        };
        let ids: Vec<Uuid> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second, older.id]);
    }
}
