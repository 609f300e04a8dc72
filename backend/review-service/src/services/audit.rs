//! Best-effort audit logging shared by every mutating service

use crate::db::AuditSink;
use crate::error::Result;
use crate::models::{AuditAction, AuditEntry};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Write one entry. Sink failures are logged and swallowed.
    pub async fn record(&self, action: AuditAction, user_id: Uuid, description: impl Into<String>) {
        let entry = AuditEntry {
            action,
            user_id,
            description: description.into(),
        };

        if let Err(e) = self.sink.log(entry).await {
            tracing::warn!(
                action = action.as_str(),
                user_id = %user_id,
                error = %e,
                "Failed to write audit log entry"
            );
        }
    }

    /// Record a guarded operation: its own description on success, a
    /// `Failed to ...` line otherwise.
    pub async fn record_outcome<T>(
        &self,
        action: AuditAction,
        user_id: Uuid,
        outcome: &Result<(T, String)>,
        attempted: &str,
    ) {
        let description = match outcome {
            Ok((_, description)) => description.clone(),
            Err(e) => format!("Failed to {}: {}", attempted, e),
        };
        self.record(action, user_id, description).await;
    }
}
