use super::AuditSink;
use crate::error::Result;
use crate::models::AuditEntry;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Audit sink writing to `audit_logs`, outside any caller transaction
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn log(&self, entry: AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, action, user_id, description, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.action.as_str())
        .bind(entry.user_id)
        .bind(&entry.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
