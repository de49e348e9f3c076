use super::{ContentStore, PostQuery, StoryQuery};
use crate::error::{AppError, Result};
use crate::models::{Audience, MediaType, Post, Story, UserProfile, ViewerEntry};
use crate::services::visibility::{AudienceScope, VisibilityWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, author_id, media_url, caption, duration_hours, created_at, expires_at, is_expired";

const STORY_COLUMNS: &str = "s.id, s.author_id, s.media_url, s.media_type, s.audience, \
     s.duration_hours, s.created_at, s.expires_at";

/// PostgreSQL-backed [`ContentStore`]. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_post(row: &PgRow) -> Result<Post> {
        Ok(Post {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            media_url: row.try_get("media_url")?,
            caption: row.try_get("caption")?,
            duration_hours: hours_from_db(row.try_get("duration_hours")?)?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            is_expired: row.try_get("is_expired")?,
        })
    }

    fn row_to_story(row: &PgRow) -> Result<Story> {
        let media_type: String = row.try_get("media_type")?;
        let audience: String = row.try_get("audience")?;
        Ok(Story {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            media_url: row.try_get("media_url")?,
            media_type: MediaType::try_from(media_type.as_str())
                .map_err(|e| AppError::Storage(e.to_string()))?,
            audience: Audience::try_from(audience.as_str())
                .map_err(|e| AppError::Storage(e.to_string()))?,
            duration_hours: hours_from_db(row.try_get("duration_hours")?)?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

fn hours_from_db(raw: i32) -> Result<u32> {
    u32::try_from(raw).map_err(|_| AppError::Storage(format!("negative duration_hours {}", raw)))
}

fn hours_to_db(hours: u32) -> Result<i32> {
    i32::try_from(hours)
        .map_err(|_| AppError::Validation(format!("duration_hours {} is out of range", hours)))
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn insert_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, media_url, caption, duration_hours, created_at, expires_at, is_expired)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.media_url)
        .bind(&post.caption)
        .bind(hours_to_db(post.duration_hours)?)
        .bind(post.created_at)
        .bind(post.expires_at)
        .bind(post.is_expired)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_story(&self, story: &Story) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stories (id, author_id, media_url, media_type, audience, duration_hours, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(story.id)
        .bind(story.author_id)
        .bind(&story.media_url)
        .bind(story.media_type.as_str())
        .bind(story.audience.as_str())
        .bind(hours_to_db(story.duration_hours)?)
        .bind(story.created_at)
        .bind(story.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_post(&self, post_id: Uuid, window: VisibilityWindow) -> Result<Option<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(POST_COLUMNS)
            .push(" FROM posts WHERE id = ")
            .push_bind(post_id)
            .push(" AND ");
        window.push_predicate(&mut qb, "expires_at");

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_post).transpose()
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(POST_COLUMNS).push(" FROM posts WHERE ");
        query.window.push_predicate(&mut qb, "expires_at");
        if let Some(author_id) = query.author_id {
            qb.push(" AND author_id = ").push_bind(author_id);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_post).collect()
    }

    async fn find_story(
        &self,
        story_id: Uuid,
        window: VisibilityWindow,
        scope: AudienceScope,
    ) -> Result<Option<Story>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(STORY_COLUMNS)
            .push(" FROM stories s WHERE s.id = ")
            .push_bind(story_id)
            .push(" AND ");
        window.push_predicate(&mut qb, "s.expires_at");
        qb.push(" AND ");
        scope.push_predicate(&mut qb, "s");

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_story).transpose()
    }

    async fn list_stories(&self, query: &StoryQuery) -> Result<Vec<Story>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(STORY_COLUMNS).push(" FROM stories s WHERE ");
        query.window.push_predicate(&mut qb, "s.expires_at");
        qb.push(" AND ");
        query.scope.push_predicate(&mut qb, "s");
        if let Some(author_id) = query.author_id {
            qb.push(" AND s.author_id = ").push_bind(author_id);
        }
        qb.push(" ORDER BY s.created_at DESC, s.id DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_story).collect()
    }

    async fn append_viewer(&self, story_id: Uuid, entry: &ViewerEntry) -> Result<bool> {
        // The composite primary key makes check-then-insert a single atomic step.
        let result = sqlx::query(
            r#"INSERT INTO story_viewers (story_id, user_id, viewed_at) VALUES ($1, $2, $3)
               ON CONFLICT (story_id, user_id) DO NOTHING"#,
        )
        .bind(story_id)
        .bind(entry.user_id)
        .bind(entry.viewed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_viewers(&self, story_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ViewerEntry>>> {
        if story_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"SELECT story_id, user_id, viewed_at FROM story_viewers
               WHERE story_id = ANY($1) ORDER BY viewed_at ASC, user_id ASC"#,
        )
        .bind(story_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut ledgers: HashMap<Uuid, Vec<ViewerEntry>> = HashMap::new();
        for row in rows {
            let story_id: Uuid = row.try_get("story_id")?;
            ledgers.entry(story_id).or_default().push(ViewerEntry {
                user_id: row.try_get("user_id")?,
                viewed_at: row.try_get("viewed_at")?,
            });
        }
        Ok(ledgers)
    }

    async fn find_profiles(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserProfile>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"SELECT id, username, profile_picture FROM users WHERE id = ANY($1)"#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<(Uuid, UserProfile)> {
                let profile = UserProfile {
                    user_id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    profile_picture: row.try_get("profile_picture")?,
                };
                Ok((profile.user_id, profile))
            })
            .collect()
    }

    async fn flag_expired_posts(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE posts SET is_expired = TRUE
               WHERE is_expired = FALSE AND expires_at IS NOT NULL AND expires_at <= $1"#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_premature_flags(&self, now: DateTime<Utc>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM posts
               WHERE is_expired = TRUE AND (expires_at IS NULL OR expires_at > $1)"#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
