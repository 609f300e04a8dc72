//! Favorites and watchlist membership

use super::LibraryRepository;
use crate::error::{AppError, Result};
use crate::models::{LibraryEntry, ListKind, Page, PageRequest};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgLibraryRepository {
    pool: PgPool,
}

impl PgLibraryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryRepository for PgLibraryRepository {
    async fn add(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<LibraryEntry> {
        let sql = format!(
            "INSERT INTO {} (user_id, content_id, created_at) VALUES ($1, $2, NOW()) \
             RETURNING user_id, content_id, created_at",
            kind.table()
        );
        let entry = sqlx::query_as::<_, LibraryEntry>(&sql)
            .bind(user_id)
            .bind(content_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::AlreadyExists(_) => {
                    AppError::AlreadyExists(format!("Content is already in your {}", kind))
                }
                other => other,
            })?;
        Ok(entry)
    }

    async fn remove(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = $1 AND content_id = $2",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(content_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        kind: ListKind,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<LibraryEntry>> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = $1",
            kind.table()
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT user_id, content_id, created_at FROM {} WHERE user_id = $1 \
             ORDER BY created_at DESC, content_id ASC LIMIT $2 OFFSET $3",
            kind.table()
        );
        let items = sqlx::query_as::<_, LibraryEntry>(&sql)
            .bind(user_id)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }

    async fn contains(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = $1 AND content_id = $2)",
            kind.table()
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(content_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn count_for_content(&self, kind: ListKind, content_id: Uuid) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE content_id = $1", kind.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(content_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_for_user(&self, kind: ListKind, user_id: Uuid) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = $1", kind.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
