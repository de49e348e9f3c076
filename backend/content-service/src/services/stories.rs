/// Story service - story lifecycle, author grouping and the viewer ledger
use super::expiry::{expires_at, ExpiryPolicy};
use super::validate_media_url;
use super::visibility::{AudienceScope, VisibilityWindow};
use crate::clock::Clock;
use crate::config::ViewerPolicy;
use crate::db::{ContentStore, StoryQuery};
use crate::error::{AppError, Result};
use crate::metrics::lifecycle as metrics;
use crate::models::{Audience, MediaType, Story, UserProfile, ViewerEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewStory {
    #[serde(default)]
    #[validate(url, custom(function = "validate_media_url"))]
    pub media_url: String,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub audience: Audience,
}

/// A viewer as shown to readers allowed to see identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ViewerSummary {
    pub user_id: Uuid,
    pub viewed_at: DateTime<Utc>,
    pub username: Option<String>,
    pub profile_picture: Option<String>,
}

/// A story as returned to one particular reader.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoryView {
    #[serde(flatten)]
    pub story: Story,
    pub viewer_count: usize,
    pub viewed_by_me: bool,
    /// Present only when the reader may see viewer identities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewers: Option<Vec<ViewerSummary>>,
}

/// One author's visible stories, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorStories {
    pub author_id: Uuid,
    /// `None` when the identity service has no profile for the author.
    pub author: Option<UserProfile>,
    pub stories: Vec<StoryView>,
}

pub struct StoriesService {
    store: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    viewer_policy: ViewerPolicy,
}

impl StoriesService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
        viewer_policy: ViewerPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            viewer_policy,
        }
    }

    pub async fn create_story(&self, author_id: Uuid, input: NewStory) -> Result<Story> {
        input.validate()?;

        let hours = self.policy.story_duration();
        let created_at = self.clock.now();
        let story = Story {
            id: Uuid::new_v4(),
            author_id,
            media_url: input.media_url,
            media_type: input.media_type,
            audience: input.audience,
            duration_hours: hours,
            created_at,
            expires_at: Some(expires_at(created_at, hours)?),
        };

        self.store.insert_story(&story).await?;
        metrics::record_content_created("story");
        tracing::info!(
            story_id = %story.id,
            author_id = %author_id,
            audience = story.audience.as_str(),
            "story created"
        );

        Ok(story)
    }

    pub async fn get_story(&self, story_id: Uuid, viewer_id: Uuid) -> Result<StoryView> {
        let story = self
            .store
            .find_story(
                story_id,
                VisibilityWindow::at(self.clock.now()),
                AudienceScope::for_viewer(viewer_id),
            )
            .await?
            .ok_or_else(|| AppError::not_found("story", story_id))?;

        let (mut views, _) = self.assemble(vec![story], viewer_id, false).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("story view assembly lost a story".into()))
    }

    /// All visible stories grouped into one bucket per author.
    pub async fn list_all_stories(&self, viewer_id: Uuid) -> Result<Vec<AuthorStories>> {
        let query = StoryQuery {
            window: VisibilityWindow::at(self.clock.now()),
            scope: AudienceScope::for_viewer(viewer_id),
            author_id: None,
        };
        let stories = self.store.list_stories(&query).await?;
        let (views, profiles) = self.assemble(stories, viewer_id, true).await?;
        Ok(group_by_author(views, &profiles))
    }

    pub async fn list_user_stories(&self, author_id: Uuid, viewer_id: Uuid) -> Result<Vec<StoryView>> {
        let query = StoryQuery {
            window: VisibilityWindow::at(self.clock.now()),
            scope: AudienceScope::for_viewer(viewer_id),
            author_id: Some(author_id),
        };
        let stories = self.store.list_stories(&query).await?;
        let (views, _) = self.assemble(stories, viewer_id, false).await?;
        Ok(views)
    }

    /// Records the first view of a story by `viewer_id`. Repeat calls are
    /// accepted and change nothing; callers cannot tell the two apart.
    pub async fn mark_viewed(&self, story_id: Uuid, viewer_id: Uuid) -> Result<()> {
        let now = self.clock.now();
        let story = self
            .store
            .find_story(
                story_id,
                VisibilityWindow::at(now),
                AudienceScope::for_viewer(viewer_id),
            )
            .await?
            .ok_or_else(|| AppError::not_found("story", story_id))?;

        let entry = ViewerEntry {
            user_id: viewer_id,
            viewed_at: now,
        };
        let recorded = self.store.append_viewer(story.id, &entry).await?;
        metrics::record_story_view(recorded);
        tracing::debug!(
            story_id = %story.id,
            viewer_id = %viewer_id,
            recorded,
            "story view"
        );

        Ok(())
    }

    fn may_see_viewers(&self, story: &Story, requester: Uuid) -> bool {
        match self.viewer_policy {
            ViewerPolicy::AnyReader => true,
            ViewerPolicy::AuthorOnly => story.author_id == requester,
        }
    }

    /// Attaches ledger data to each story and resolves every profile the
    /// response needs in a single lookup.
    async fn assemble(
        &self,
        stories: Vec<Story>,
        requester: Uuid,
        include_authors: bool,
    ) -> Result<(Vec<StoryView>, HashMap<Uuid, UserProfile>)> {
        if stories.is_empty() {
            return Ok((Vec::new(), HashMap::new()));
        }

        let ids: Vec<Uuid> = stories.iter().map(|s| s.id).collect();
        let mut ledgers = self.store.list_viewers(&ids).await?;

        let mut wanted: HashSet<Uuid> = HashSet::new();
        for story in &stories {
            if include_authors {
                wanted.insert(story.author_id);
            }
            if self.may_see_viewers(story, requester) {
                if let Some(ledger) = ledgers.get(&story.id) {
                    wanted.extend(ledger.iter().map(|v| v.user_id));
                }
            }
        }

        let profiles = if wanted.is_empty() {
            HashMap::new()
        } else {
            let wanted: Vec<Uuid> = wanted.into_iter().collect();
            self.store.find_profiles(&wanted).await?
        };

        let views = stories
            .into_iter()
            .map(|story| {
                let ledger = ledgers.remove(&story.id).unwrap_or_default();
                let viewers = self
                    .may_see_viewers(&story, requester)
                    .then(|| summarize(&ledger, &profiles));
                StoryView {
                    viewer_count: ledger.len(),
                    viewed_by_me: ledger.iter().any(|v| v.user_id == requester),
                    viewers,
                    story,
                }
            })
            .collect();

        Ok((views, profiles))
    }
}

fn summarize(ledger: &[ViewerEntry], profiles: &HashMap<Uuid, UserProfile>) -> Vec<ViewerSummary> {
    ledger
        .iter()
        .map(|entry| {
            let profile = profiles.get(&entry.user_id);
            ViewerSummary {
                user_id: entry.user_id,
                viewed_at: entry.viewed_at,
                username: profile.map(|p| p.username.clone()),
                profile_picture: profile.and_then(|p| p.profile_picture.clone()),
            }
        })
        .collect()
}

/// Buckets newest-first views by author. Buckets are ordered by each
/// author's newest story and keep the input order inside.
pub fn group_by_author(
    views: Vec<StoryView>,
    profiles: &HashMap<Uuid, UserProfile>,
) -> Vec<AuthorStories> {
    let mut buckets: Vec<AuthorStories> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for view in views {
        let author_id = view.story.author_id;
        let slot = *index.entry(author_id).or_insert_with(|| {
            buckets.push(AuthorStories {
                author_id,
                author: profiles.get(&author_id).cloned(),
                stories: Vec::new(),
            });
            buckets.len() - 1
        });
        buckets[slot].stories.push(view);
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::{InMemoryContentStore, MockContentStore};
    use chrono::{Duration, TimeZone};

    struct Harness {
        store: Arc<InMemoryContentStore>,
        clock: Arc<ManualClock>,
        service: StoriesService,
    }

    fn harness(viewer_policy: ViewerPolicy) -> Harness {
        let store = Arc::new(InMemoryContentStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 7, 4, 18, 30, 0).unwrap(),
        ));
        let service = StoriesService::new(
            store.clone(),
            clock.clone(),
            ExpiryPolicy::default(),
            viewer_policy,
        );
        Harness {
            store,
            clock,
            service,
        }
    }

    fn new_story() -> NewStory {
        NewStory {
            media_url: "https://cdn.ephora.app/s/1.jpg".into(),
            media_type: MediaType::Image,
            audience: Audience::Public,
        }
    }

    fn profile(user_id: Uuid, name: &str) -> UserProfile {
        UserProfile {
            user_id,
            username: name.to_string(),
            profile_picture: Some(format!("https://cdn.ephora.app/u/{}.jpg", name)),
        }
    }

    #[tokio::test]
    async fn story_gets_default_lifetime() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let story = h.service.create_story(Uuid::new_v4(), new_story()).await.unwrap();

        assert_eq!(story.duration_hours, 24);
        assert_eq!(story.created_at, h.clock.now());
        assert_eq!(story.expires_at, Some(h.clock.now() + Duration::hours(24)));
    }

    #[tokio::test]
    async fn story_expires_without_any_delete() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let viewer = Uuid::new_v4();
        let t0 = h.clock.now();
        let story = h.service.create_story(Uuid::new_v4(), new_story()).await.unwrap();

        h.clock.set(t0 + Duration::hours(23) + Duration::minutes(59));
        let buckets = h.service.list_all_stories(viewer).await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].stories[0].story.id, story.id);

        h.clock.set(t0 + Duration::hours(24) + Duration::minutes(1));
        assert!(h.service.list_all_stories(viewer).await.unwrap().is_empty());
        assert_eq!(h.store.story_count(), 1);
    }

    #[tokio::test]
    async fn listing_excludes_story_at_exact_expiry() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let viewer = Uuid::new_v4();
        let story = h.service.create_story(Uuid::new_v4(), new_story()).await.unwrap();
        let expiry = story.expires_at.unwrap();

        h.clock.set(expiry - Duration::seconds(1));
        assert_eq!(h.service.list_all_stories(viewer).await.unwrap().len(), 1);

        h.clock.set(expiry);
        assert!(h.service.list_all_stories(viewer).await.unwrap().is_empty());
        assert!(h
            .service
            .list_user_stories(story.author_id, viewer)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn mark_viewed_is_idempotent_per_user() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let author = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let story = h.service.create_story(author, new_story()).await.unwrap();

        let t1 = h.clock.now() + Duration::minutes(5);
        h.clock.set(t1);
        h.service.mark_viewed(story.id, a).await.unwrap();
        h.clock.advance(Duration::minutes(30));
        h.service.mark_viewed(story.id, a).await.unwrap();

        let ledger = h.store.list_viewers(&[story.id]).await.unwrap();
        assert_eq!(ledger[&story.id].len(), 1);
        assert_eq!(ledger[&story.id][0].viewed_at, t1);

        h.service.mark_viewed(story.id, b).await.unwrap();
        let ledger = h.store.list_viewers(&[story.id]).await.unwrap();
        assert_eq!(ledger[&story.id].len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_views_leave_one_entry() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let story = h.service.create_story(Uuid::new_v4(), new_story()).await.unwrap();
        let story_id = story.id;
        let viewer = Uuid::new_v4();
        let service = Arc::new(h.service);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..64 {
            let service = service.clone();
            tasks.spawn(async move { service.mark_viewed(story_id, viewer).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let ledger = h.store.list_viewers(&[story.id]).await.unwrap();
        assert_eq!(ledger[&story.id].len(), 1);
        assert_eq!(ledger[&story.id][0].user_id, viewer);
    }

    #[tokio::test]
    async fn unrepresentable_expiry_fails_without_storing() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let lifecycle = crate::config::LifecycleConfig {
            story_lifetime_hours: u32::MAX,
            ..crate::config::LifecycleConfig::default()
        };
        let service = StoriesService::new(
            h.store.clone(),
            h.clock.clone(),
            ExpiryPolicy::from(&lifecycle),
            ViewerPolicy::AuthorOnly,
        );

        let result = service.create_story(Uuid::new_v4(), new_story()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(h.store.story_count(), 0);
    }

    #[tokio::test]
    async fn mark_viewed_rejects_missing_and_expired_stories() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let viewer = Uuid::new_v4();

        let err = h.service.mark_viewed(Uuid::new_v4(), viewer).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let story = h.service.create_story(Uuid::new_v4(), new_story()).await.unwrap();
        h.clock.advance(Duration::hours(24));
        let err = h.service.mark_viewed(story.id, viewer).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.store.list_viewers(&[story.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn groups_by_author_newest_first() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        h.store.upsert_profile(profile(alice, "alice"));
        h.store.upsert_profile(profile(bob, "bob"));

        let a1 = h.service.create_story(alice, new_story()).await.unwrap();
        h.clock.advance(Duration::minutes(1));
        let b1 = h.service.create_story(bob, new_story()).await.unwrap();
        h.clock.advance(Duration::minutes(1));
        let a2 = h.service.create_story(alice, new_story()).await.unwrap();

        let buckets = h.service.list_all_stories(Uuid::new_v4()).await.unwrap();
        assert_eq!(buckets.len(), 2);

        assert_eq!(buckets[0].author_id, alice);
        assert_eq!(buckets[0].author.as_ref().unwrap().username, "alice");
        let alice_ids: Vec<Uuid> = buckets[0].stories.iter().map(|v| v.story.id).collect();
        assert_eq!(alice_ids, vec![a2.id, a1.id]);

        assert_eq!(buckets[1].author_id, bob);
        assert_eq!(buckets[1].stories.len(), 1);
        assert_eq!(buckets[1].stories[0].story.id, b1.id);
    }

    #[tokio::test]
    async fn unknown_author_profile_keeps_bucket() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let author = Uuid::new_v4();
        h.service.create_story(author, new_story()).await.unwrap();

        let buckets = h.service.list_all_stories(Uuid::new_v4()).await.unwrap();
        assert_eq!(buckets[0].author_id, author);
        assert!(buckets[0].author.is_none());
    }

    #[tokio::test]
    async fn only_author_sees_viewer_identities_by_default() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let author = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        h.store.upsert_profile(profile(viewer, "vic"));
        let story = h.service.create_story(author, new_story()).await.unwrap();
        h.service.mark_viewed(story.id, viewer).await.unwrap();

        let as_viewer = h.service.get_story(story.id, viewer).await.unwrap();
        assert_eq!(as_viewer.viewer_count, 1);
        assert!(as_viewer.viewed_by_me);
        assert!(as_viewer.viewers.is_none());

        let as_author = h.service.get_story(story.id, author).await.unwrap();
        assert!(!as_author.viewed_by_me);
        let viewers = as_author.viewers.unwrap();
        assert_eq!(viewers.len(), 1);
        assert_eq!(viewers[0].user_id, viewer);
        assert_eq!(viewers[0].username.as_deref(), Some("vic"));
    }

    #[tokio::test]
    async fn any_reader_policy_exposes_viewers_to_everyone() {
        let h = harness(ViewerPolicy::AnyReader);
        let viewer = Uuid::new_v4();
        let other = Uuid::new_v4();
        let story = h.service.create_story(Uuid::new_v4(), new_story()).await.unwrap();
        h.service.mark_viewed(story.id, viewer).await.unwrap();

        let buckets = h.service.list_all_stories(other).await.unwrap();
        let viewers = buckets[0].stories[0].viewers.as_ref().unwrap();
        assert_eq!(viewers.len(), 1);
        assert_eq!(viewers[0].user_id, viewer);
        assert!(viewers[0].username.is_none());
    }

    #[tokio::test]
    async fn followers_audience_hides_story_from_strangers() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let author = Uuid::new_v4();
        let follower = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        h.store.follow(follower, author);

        let story = h
            .service
            .create_story(
                author,
                NewStory {
                    audience: Audience::Followers,
                    ..new_story()
                },
            )
            .await
            .unwrap();

        assert_eq!(h.service.list_all_stories(follower).await.unwrap().len(), 1);
        assert_eq!(h.service.list_all_stories(author).await.unwrap().len(), 1);
        assert!(h.service.list_all_stories(stranger).await.unwrap().is_empty());

        let err = h.service.mark_viewed(story.id, stranger).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        h.service.mark_viewed(story.id, follower).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_media_creates_nothing() {
        let h = harness(ViewerPolicy::AuthorOnly);
        let err = h
            .service
            .create_story(
                Uuid::new_v4(),
                NewStory {
                    media_url: "not a url".into(),
                    ..new_story()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.store.story_count(), 0);
    }

    #[tokio::test]
    async fn ledger_write_failure_is_not_swallowed() {
        let story = Story {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            media_url: "https://cdn.ephora.app/s/2.jpg".into(),
            media_type: MediaType::Video,
            audience: Audience::Public,
            duration_hours: 24,
            created_at: Utc::now(),
            expires_at: None,
        };
        let found = story.clone();

        let mut store = MockContentStore::new();
        store
            .expect_find_story()
            .returning(move |_, _, _| Ok(Some(found.clone())));
        store
            .expect_append_viewer()
            .times(1)
            .returning(|_, _| Err(AppError::Storage("write timeout".into())));

        let service = StoriesService::new(
            Arc::new(store),
            Arc::new(ManualClock::new(Utc::now())),
            ExpiryPolicy::default(),
            ViewerPolicy::AuthorOnly,
        );
        let err = service.mark_viewed(story.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
