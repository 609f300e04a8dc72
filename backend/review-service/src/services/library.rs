/// Favorites and watchlist
use super::audit::AuditLogger;
use crate::db::{ContentLookup, LibraryRepository, Store};
use crate::error::{AppError, Result};
use crate::models::library::LibraryItemView;
use crate::models::{ContentSummary, LibraryEntry, ListKind, Page, PageRequest};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct LibraryService {
    library: Arc<dyn LibraryRepository>,
    contents: Arc<dyn ContentLookup>,
    audit: AuditLogger,
}

impl LibraryService {
    pub fn new(store: &Store, audit: AuditLogger) -> Self {
        Self {
            library: store.library.clone(),
            contents: store.contents.clone(),
            audit,
        }
    }

    pub async fn add(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<LibraryEntry> {
        let outcome = self.try_add(kind, user_id, content_id).await;
        let attempted = format!("add content to {}", kind);
        self.audit
            .record_outcome(kind.add_action(), user_id, &outcome, &attempted)
            .await;
        outcome.map(|(entry, _)| entry)
    }

    async fn try_add(
        &self,
        kind: ListKind,
        user_id: Uuid,
        content_id: Uuid,
    ) -> Result<(LibraryEntry, String)> {
        let content = self.content(content_id).await?;
        let entry = self.library.add(kind, user_id, content_id).await?;
        tracing::info!(list = %kind, user_id = %user_id, content_id = %content_id, "Added to list");
        Ok((entry, format!("Added {} to {}", content.describe(), kind)))
    }

    pub async fn remove(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<()> {
        let outcome = self.try_remove(kind, user_id, content_id).await;
        let attempted = format!("remove content from {}", kind);
        self.audit
            .record_outcome(kind.remove_action(), user_id, &outcome, &attempted)
            .await;
        outcome.map(|_| ())
    }

    async fn try_remove(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<((), String)> {
        let content = self.content(content_id).await?;
        if !self.library.remove(kind, user_id, content_id).await? {
            return Err(AppError::NotFound(format!(
                "{} is not in your {}",
                content.describe(),
                kind
            )));
        }
        tracing::info!(list = %kind, user_id = %user_id, content_id = %content_id, "Removed from list");
        Ok(((), format!("Removed {} from {}", content.describe(), kind)))
    }

    /// Newest first, with the content summary attached
    pub async fn list(
        &self,
        kind: ListKind,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<LibraryItemView>> {
        let entries = self.library.list(kind, user_id, page).await?;
        let ids: Vec<Uuid> = entries.items.iter().map(|e| e.content_id).collect();
        let contents = self.contents.find_contents(&ids).await?;

        Ok(entries.map(|entry| LibraryItemView {
            content: contents.get(&entry.content_id).cloned(),
            entry,
        }))
    }

    pub async fn contains(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<bool> {
        self.library.contains(kind, user_id, content_id).await
    }

    pub async fn count_for_content(&self, kind: ListKind, content_id: Uuid) -> Result<i64> {
        self.library.count_for_content(kind, content_id).await
    }

    pub async fn count_for_user(&self, kind: ListKind, user_id: Uuid) -> Result<i64> {
        self.library.count_for_user(kind, user_id).await
    }

    async fn content(&self, content_id: Uuid) -> Result<ContentSummary> {
        self.contents
            .find_content(content_id)
            .await?
            .ok_or_else(|| AppError::not_found("Content", content_id))
    }
}
