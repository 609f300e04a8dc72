use super::reports::delete_reports_for;
use super::EpisodeReviewRepository;
use crate::error::{AppError, Result};
use crate::models::pagination::like_pattern;
use crate::models::review::{CreateEpisodeReview, ReviewPatch};
use crate::models::{EpisodeReview, EpisodeReviewFilter, Page, PageRequest, ReportType};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const SELECT_EPISODE_REVIEWS: &str = r#"
    SELECT id, content_reviewed, rating, episode_id, user_id, status, created_at, updated_at
    FROM episode_reviews
"#;

pub struct PgEpisodeReviewRepository {
    pool: PgPool,
}

impl PgEpisodeReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &EpisodeReviewFilter) {
    if let Some(episode_id) = filter.episode_id {
        qb.push(" AND episode_id = ").push_bind(episode_id);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(search) = filter.search.as_deref() {
        qb.push(" AND content_reviewed ILIKE ")
            .push_bind(like_pattern(search));
    }
}

#[async_trait]
impl EpisodeReviewRepository for PgEpisodeReviewRepository {
    async fn create(&self, user_id: Uuid, input: &CreateEpisodeReview) -> Result<EpisodeReview> {
        let review = sqlx::query_as::<_, EpisodeReview>(
            r#"
            INSERT INTO episode_reviews (id, content_reviewed, rating, episode_id, user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'ACTIVE', NOW(), NOW())
            RETURNING id, content_reviewed, rating, episode_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.content_reviewed)
        .bind(input.rating)
        .bind(input.episode_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists(_) => {
                AppError::AlreadyExists("You have already reviewed this episode".to_string())
            }
            other => other,
        })?;

        Ok(review)
    }

    async fn update(&self, id: Uuid, patch: &ReviewPatch) -> Result<EpisodeReview> {
        let review = sqlx::query_as::<_, EpisodeReview>(
            r#"
            UPDATE episode_reviews
            SET content_reviewed = COALESCE($2, content_reviewed),
                rating = COALESCE($3, rating),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, content_reviewed, rating, episode_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.content_reviewed.as_deref())
        .bind(patch.rating)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Episode review", id))?;

        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> Result<EpisodeReview> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, EpisodeReview>(
            r#"
            SELECT id, content_reviewed, rating, episode_id, user_id, status, created_at, updated_at
            FROM episode_reviews
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Episode review", id))?;

        let reply_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM review_replies WHERE episode_review_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let mut reports_removed =
            delete_reports_for(&mut tx, ReportType::EpisodeReview, &[id]).await?;
        reports_removed += delete_reports_for(&mut tx, ReportType::ReviewReply, &reply_ids).await?;

        sqlx::query("DELETE FROM review_replies WHERE episode_review_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM episode_reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            episode_review_id = %id,
            replies_removed = reply_ids.len(),
            reports_removed,
            "Episode review cascade committed"
        );

        Ok(review)
    }

    async fn find(&self, id: Uuid) -> Result<Option<EpisodeReview>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EPISODE_REVIEWS);
        qb.push(" WHERE id = ").push_bind(id);
        let review = qb
            .build_query_as::<EpisodeReview>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<EpisodeReview>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EPISODE_REVIEWS);
        qb.push(" WHERE id = ANY(").push_bind(ids.to_vec()).push(")");
        let reviews = qb
            .build_query_as::<EpisodeReview>()
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }

    async fn list(
        &self,
        filter: &EpisodeReviewFilter,
        page: PageRequest,
    ) -> Result<Page<EpisodeReview>> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM episode_reviews WHERE 1=1");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EPISODE_REVIEWS);
        qb.push(" WHERE 1=1");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ").push(filter.sort.order_by());
        qb.push(" LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb
            .build_query_as::<EpisodeReview>()
            .fetch_all(&self.pool)
            .await?;
        Ok(Page::new(items, total, page))
    }
}
