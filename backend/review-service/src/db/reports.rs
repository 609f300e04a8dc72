//! User reports and the moderation writes that resolve them

use super::ReportRepository;
use crate::error::{AppError, Result};
use crate::models::report::CreateReport;
use crate::models::{ModerationStatus, Report, ReportFilter, ReportStatus, ReportTarget, ReportType};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Delete every report of `report_type` whose target is in `target_ids`
pub(crate) async fn delete_reports_for(
    conn: &mut PgConnection,
    report_type: ReportType,
    target_ids: &[Uuid],
) -> Result<u64> {
    if target_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM reports WHERE report_type = $1 AND target_id = ANY($2)")
        .bind(report_type)
        .bind(target_ids)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn create(&self, reporter_id: Uuid, input: &CreateReport) -> Result<Report> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (id, report_type, target_id, reason, details, status, reporter_id, created_at)
            VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, NOW())
            RETURNING id, report_type, target_id, reason, details, status, reporter_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.report_type)
        .bind(input.target_id)
        .bind(&input.reason)
        .bind(input.details.as_deref())
        .bind(reporter_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists(_) => {
                AppError::AlreadyExists("You have already reported this item".to_string())
            }
            other => other,
        })?;


        Ok(report)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Report>> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, report_type, target_id, reason, details, status, reporter_id, created_at
            FROM reports
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }

    async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT id, report_type, target_id, reason, details, status, reporter_id, created_at
            FROM reports
            WHERE 1=1
            "#,
        );
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(report_type) = filter.report_type {
            qb.push(" AND report_type = ").push_bind(report_type);
        }
        qb.push(" ORDER BY created_at DESC, id ASC");

        let reports = qb.build_query_as::<Report>().fetch_all(&self.pool).await?;
        Ok(reports)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
    ) -> Result<Option<Report>> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING id, report_type, target_id, reason, details, status, reporter_id, created_at
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(report) = &report {
            tracing::debug!(report_id = %report.id, status = to.as_str(), "Report status swapped");
        }
        Ok(report)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn moderate(&self, target: ReportTarget, status: ModerationStatus) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE {} SET status = $2, updated_at = NOW() WHERE id = $1",
            target.table()
        );
        let updated = sqlx::query(&sql)
            .bind(target.id())
            .bind(status)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(AppError::not_found(target.report_type().label(), target.id()));
        }

        let approved = if status == ModerationStatus::Banned {
            sqlx::query(
                r#"
                UPDATE reports
                SET status = 'APPROVED'
                WHERE report_type = $1 AND target_id = $2 AND status = 'PENDING'
                "#,
            )
            .bind(target.report_type())
            .bind(target.id())
            .execute(&mut *tx)
            .await?
            .rows_affected()
        } else {
            0
        };

        tx.commit().await?;

        tracing::debug!(
            target_type = target.report_type().as_str(),
            target_id = %target.id(),
            reports_approved = approved,
            "Moderation transaction committed"
        );

        Ok(approved)
    }
}
