//! Content reviews and the content average rating they drive

use super::reports::delete_reports_for;
use super::ReviewRepository;
use crate::error::{AppError, Result};
use crate::models::pagination::like_pattern;
use crate::models::review::{CreateReview, ReviewPatch};
use crate::models::{Page, PageRequest, ReportType, Review, ReviewFilter};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const SELECT_REVIEWS: &str = r#"
    SELECT id, content_reviewed, rating, content_id, user_id, status, created_at, updated_at
    FROM reviews
"#;

pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Rewrite `contents.avg_rating` from the reviews visible to `conn`.
///
/// Must run on the same transaction as the write that triggered it.
pub(crate) async fn recompute_avg_rating(conn: &mut PgConnection, content_id: Uuid) -> Result<f64> {
    let (avg_rating, review_count): (f64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(AVG(rating), 0)::float8, COUNT(*)
        FROM reviews
        WHERE content_id = $1
        "#,
    )
    .bind(content_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE contents SET avg_rating = $2 WHERE id = $1")
        .bind(content_id)
        .bind(avg_rating)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(
        content_id = %content_id,
        avg_rating,
        review_count,
        "Average rating recomputed"
    );

    Ok(avg_rating)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReviewFilter) {
    if let Some(content_id) = filter.content_id {
        qb.push(" AND content_id = ").push_bind(content_id);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(search) = filter.search.as_deref() {
        qb.push(" AND content_reviewed ILIKE ")
            .push_bind(like_pattern(search));
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create(&self, user_id: Uuid, input: &CreateReview) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, content_reviewed, rating, content_id, user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'ACTIVE', NOW(), NOW())
            RETURNING id, content_reviewed, rating, content_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.content_reviewed)
        .bind(input.rating)
        .bind(input.content_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        recompute_avg_rating(&mut tx, review.content_id).await?;
        tx.commit().await?;

        Ok(review)
    }

    async fn update(&self, id: Uuid, patch: &ReviewPatch) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET content_reviewed = COALESCE($2, content_reviewed),
                rating = COALESCE($3, rating),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, content_reviewed, rating, content_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.content_reviewed.as_deref())
        .bind(patch.rating)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Review", id))?;

        recompute_avg_rating(&mut tx, review.content_id).await?;
        tx.commit().await?;

        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        // Row lock blocks concurrent reply inserts (their FK check needs a
        // share lock on this row) until we are done.
        let review = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, content_reviewed, rating, content_id, user_id, status, created_at, updated_at
            FROM reviews
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Review", id))?;

        let reply_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM review_replies WHERE review_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let mut reports_removed = delete_reports_for(&mut tx, ReportType::Review, &[id]).await?;
        reports_removed += delete_reports_for(&mut tx, ReportType::ReviewReply, &reply_ids).await?;

        sqlx::query("DELETE FROM review_replies WHERE review_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        recompute_avg_rating(&mut tx, review.content_id).await?;
        tx.commit().await?;

        tracing::debug!(
            review_id = %id,
            replies_removed = reply_ids.len(),
            reports_removed,
            "Review cascade committed"
        );

        Ok(review)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Review>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_REVIEWS);
        qb.push(" WHERE id = ").push_bind(id);
        let review = qb
            .build_query_as::<Review>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Review>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_REVIEWS);
        qb.push(" WHERE id = ANY(").push_bind(ids.to_vec()).push(")");
        let reviews = qb.build_query_as::<Review>().fetch_all(&self.pool).await?;
        Ok(reviews)
    }

    async fn list(&self, filter: &ReviewFilter, page: PageRequest) -> Result<Page<Review>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reviews WHERE 1=1");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT_REVIEWS);
        qb.push(" WHERE 1=1");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ").push(filter.sort.order_by());
        qb.push(" LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb.build_query_as::<Review>().fetch_all(&self.pool).await?;
        Ok(Page::new(items, total, page))
    }
}
