//! Read-only views of catalog and user tables owned by other services

use super::{ContentLookup, UserDirectory};
use crate::error::Result;
use crate::models::{ContentKind, ContentSummary, Episode, MediaRef, UserSummary};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

pub struct PgContentLookup {
    pool: PgPool,
}

impl PgContentLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentLookup for PgContentLookup {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentSummary>> {
        let content = sqlx::query_as::<_, ContentSummary>(
            "SELECT id, title, kind, avg_rating, created_at FROM contents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(content)
    }

    async fn find_contents(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ContentSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, ContentSummary>(
            "SELECT id, title, kind, avg_rating, created_at FROM contents WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }

    async fn media_ref(&self, content_id: Uuid) -> Result<Option<MediaRef>> {
        let row: Option<(Option<Uuid>, Option<Uuid>)> = sqlx::query_as(
            r#"
            SELECT m.id, s.id
            FROM contents c
            LEFT JOIN movies m ON m.content_id = c.id
            LEFT JOIN tv_series s ON s.content_id = c.id
            WHERE c.id = $1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((Some(movie_id), _)) => Some(MediaRef {
                kind: ContentKind::Movie,
                id: movie_id,
            }),
            Some((None, Some(series_id))) => Some(MediaRef {
                kind: ContentKind::TvSeries,
                id: series_id,
            }),
            _ => None,
        })
    }

    async fn find_episode(&self, id: Uuid) -> Result<Option<Episode>> {
        let episode = sqlx::query_as::<_, Episode>(
            r#"
            SELECT id, content_id, season_number, episode_number, title
            FROM episodes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(episode)
    }

    async fn find_episodes(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Episode>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, Episode>(
            r#"
            SELECT id, content_id, season_number, episode_number, title
            FROM episodes
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|e| (e.id, e)).collect())
    }
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|u| (u.id, u)).collect())
    }
}
