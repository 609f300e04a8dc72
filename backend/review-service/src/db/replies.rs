//! Reply tree storage

use super::reports::delete_reports_for;
use super::{zero_filled, ReplyRepository};
use crate::error::{AppError, Result};
use crate::models::pagination::like_pattern;
use crate::models::reply::{ReplyAttachment, ReplyParent};
use crate::models::{
    Page, PageRequest, ParentFilter, ReplyFilter, ReplySubtree, ReportType, ReviewReply,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

const SELECT_REPLIES: &str = r#"
    SELECT id, content, status, user_id, review_id, episode_review_id, parent_reply_id,
           created_at, updated_at
    FROM review_replies
"#;

pub struct PgReplyRepository {
    pool: PgPool,
}

impl PgReplyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReplyFilter) {
    if let Some(review_id) = filter.review_id {
        qb.push(" AND review_id = ").push_bind(review_id);
    }
    if let Some(episode_review_id) = filter.episode_review_id {
        qb.push(" AND episode_review_id = ").push_bind(episode_review_id);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    match filter.parent {
        ParentFilter::Any => {}
        ParentFilter::Root => {
            qb.push(" AND parent_reply_id IS NULL");
        }
        ParentFilter::Children(parent_id) => {
            qb.push(" AND parent_reply_id = ").push_bind(parent_id);
        }
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(search) = filter.search.as_deref() {
        qb.push(" AND content ILIKE ").push_bind(like_pattern(search));
    }
}

#[async_trait]
impl ReplyRepository for PgReplyRepository {
    async fn create(
        &self,
        user_id: Uuid,
        attachment: ReplyAttachment,
        parent_reply_id: Option<Uuid>,
        content: &str,
    ) -> Result<ReviewReply> {
        let mut tx = self.pool.begin().await?;

        // Holding a share lock on the parent makes a concurrent subtree
        // delete wait for this insert (and then pick the new row up).
        if let Some(parent_id) = parent_reply_id {
            let parent: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM review_replies WHERE id = $1 FOR SHARE")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if parent.is_none() {
                return Err(AppError::not_found("Parent reply", parent_id));
            }
        }

        let reply = sqlx::query_as::<_, ReviewReply>(
            r#"
            INSERT INTO review_replies (id, content, status, user_id, review_id, episode_review_id,
                                        parent_reply_id, created_at, updated_at)
            VALUES ($1, $2, 'ACTIVE', $3, $4, $5, $6, NOW(), NOW())
            RETURNING id, content, status, user_id, review_id, episode_review_id, parent_reply_id,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content)
        .bind(user_id)
        .bind(attachment.review_id())
        .bind(attachment.episode_review_id())
        .bind(parent_reply_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(reply)
    }

    async fn update_content(&self, id: Uuid, content: &str) -> Result<ReviewReply> {
        let reply = sqlx::query_as::<_, ReviewReply>(
            r#"
            UPDATE review_replies
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, content, status, user_id, review_id, episode_review_id, parent_reply_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Reply", id))?;

        Ok(reply)
    }

    async fn delete_subtree(&self, root: Uuid) -> Result<ReplySubtree> {
        let mut tx = self.pool.begin().await?;

        let root: Uuid =
            sqlx::query_scalar("SELECT id FROM review_replies WHERE id = $1 FOR UPDATE")
                .bind(root)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found("Reply", root))?;

        let mut subtree = ReplySubtree::new(root);
        loop {
            let children: Vec<Uuid> = sqlx::query_scalar(
                "SELECT id FROM review_replies WHERE parent_reply_id = ANY($1) FOR UPDATE",
            )
            .bind(subtree.frontier())
            .fetch_all(&mut *tx)
            .await?;

            if !subtree.push_level(children) {
                break;
            }
        }

        let reports_removed =
            delete_reports_for(&mut tx, ReportType::ReviewReply, &subtree.ids()).await?;

        for level in subtree.deletion_order() {
            sqlx::query("DELETE FROM review_replies WHERE id = ANY($1)")
                .bind(level)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            reply_id = %root,
            reports_removed,
            "Reply subtree cascade committed"
        );

        Ok(subtree)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ReviewReply>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_REPLIES);
        qb.push(" WHERE id = ").push_bind(id);
        let reply = qb
            .build_query_as::<ReviewReply>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(reply)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<ReviewReply>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_REPLIES);
        qb.push(" WHERE id = ANY(").push_bind(ids.to_vec()).push(")");
        let replies = qb
            .build_query_as::<ReviewReply>()
            .fetch_all(&self.pool)
            .await?;
        Ok(replies)
    }

    async fn list(&self, filter: &ReplyFilter, page: PageRequest) -> Result<Page<ReviewReply>> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM review_replies WHERE 1=1");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT_REPLIES);
        qb.push(" WHERE 1=1");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ").push(filter.sort.order_by());
        qb.push(" LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb
            .build_query_as::<ReviewReply>()
            .fetch_all(&self.pool)
            .await?;
        Ok(Page::new(items, total, page))
    }

    async fn count_active(&self, parent: ReplyParent, id: Uuid) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM review_replies WHERE {} = $1 AND status = 'ACTIVE'",
            parent.column()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_active_by(
        &self,
        parent: ReplyParent,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let column = parent.column();
        let sql = format!(
            "SELECT {column}, COUNT(*) FROM review_replies \
             WHERE {column} = ANY($1) AND status = 'ACTIVE' \
             GROUP BY {column}"
        );
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(zero_filled(ids, rows))
    }
}
