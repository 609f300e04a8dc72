//! Persistence layer
//!
//! Every collaborator the services talk to sits behind one of the traits in
//! this module. Two backends implement all of them:
//!
//! - PostgreSQL (`Pg*` types): every multi-statement mutation runs inside a
//!   single sqlx transaction; dropping the transaction on an early `?` rolls
//!   it back.
//! - [`memory::MemoryStore`]: one `RwLock` held for the whole of each call,
//!   used by the test suite and `STORE_BACKEND=memory`.

pub mod audit;
pub mod catalog;
pub mod episode_reviews;
pub mod library;
pub mod memory;
pub mod pool;
pub mod replies;
pub mod reports;
pub mod reviews;

use crate::error::Result;
use crate::models::reply::{ReplyAttachment, ReplyParent};
use crate::models::report::CreateReport;
use crate::models::review::{CreateEpisodeReview, CreateReview, ReviewPatch};
use crate::models::{
    AuditEntry, ContentSummary, Episode, EpisodeReview, EpisodeReviewFilter, LibraryEntry,
    ListKind, MediaRef, ModerationStatus, Page, PageRequest, ReplyFilter, ReplySubtree, Report,
    ReportFilter, ReportStatus, ReportTarget, Review, ReviewFilter, ReviewReply, UserSummary,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use pool::create_pool;

/// Catalog lookups (owned by the catalog service)
#[async_trait]
pub trait ContentLookup: Send + Sync {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentSummary>>;

    async fn find_contents(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ContentSummary>>;

    /// Movie or series row behind a generic content id
    async fn media_ref(&self, content_id: Uuid) -> Result<Option<MediaRef>>;

    async fn find_episode(&self, id: Uuid) -> Result<Option<Episode>>;

    async fn find_episodes(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Episode>>;
}

/// User directory (owned by identity-service)
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>>;

    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>>;
}

/// Append-only audit trail. Callers treat failures as non-fatal.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(&self, entry: AuditEntry) -> Result<()>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert the review and rewrite the content's average rating atomically
    async fn create(&self, user_id: Uuid, input: &CreateReview) -> Result<Review>;

    /// Apply the patch and rewrite the average rating atomically
    async fn update(&self, id: Uuid, patch: &ReviewPatch) -> Result<Review>;

    /// Remove the review, its replies and every report on either, then
    /// rewrite the average rating, all atomically
    async fn delete(&self, id: Uuid) -> Result<Review>;

    async fn find(&self, id: Uuid) -> Result<Option<Review>>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Review>>;

    async fn list(&self, filter: &ReviewFilter, page: PageRequest) -> Result<Page<Review>>;
}

#[async_trait]
pub trait EpisodeReviewRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the user already reviewed the episode
    async fn create(&self, user_id: Uuid, input: &CreateEpisodeReview) -> Result<EpisodeReview>;

    async fn update(&self, id: Uuid, patch: &ReviewPatch) -> Result<EpisodeReview>;

    /// Remove the review, its replies and every report on either
    async fn delete(&self, id: Uuid) -> Result<EpisodeReview>;

    async fn find(&self, id: Uuid) -> Result<Option<EpisodeReview>>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<EpisodeReview>>;

    async fn list(
        &self,
        filter: &EpisodeReviewFilter,
        page: PageRequest,
    ) -> Result<Page<EpisodeReview>>;
}

#[async_trait]
pub trait ReplyRepository: Send + Sync {
    /// Insert a reply. A given parent must still exist when the row is
    /// written (`NotFound` otherwise).
    async fn create(
        &self,
        user_id: Uuid,
        attachment: ReplyAttachment,
        parent_reply_id: Option<Uuid>,
        content: &str,
    ) -> Result<ReviewReply>;

    async fn update_content(&self, id: Uuid, content: &str) -> Result<ReviewReply>;

    /// Delete a reply, all of its descendants and every REVIEW_REPLY report
    /// targeting any of them, leaves first, in one transaction
    async fn delete_subtree(&self, root: Uuid) -> Result<ReplySubtree>;

    async fn find(&self, id: Uuid) -> Result<Option<ReviewReply>>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<ReviewReply>>;

    async fn list(&self, filter: &ReplyFilter, page: PageRequest) -> Result<Page<ReviewReply>>;

    /// ACTIVE replies directly under one parent
    async fn count_active(&self, parent: ReplyParent, id: Uuid) -> Result<i64>;

    /// ACTIVE replies per parent id in one grouped query; ids without
    /// replies map to 0
    async fn count_active_by(
        &self,
        parent: ReplyParent,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Fails with `AlreadyExists` on a second report of the same target by
    /// the same reporter
    async fn create(&self, reporter_id: Uuid, input: &CreateReport) -> Result<Report>;

    async fn find(&self, id: Uuid) -> Result<Option<Report>>;

    /// Status/type filtered, unpaginated; search and paging happen upstream
    async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>>;

    /// Compare-and-set on the report status. `None` when the report is not
    /// currently in `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
    ) -> Result<Option<Report>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Set the target's moderation status. Banning also approves the
    /// target's PENDING reports in the same transaction; returns how many.
    async fn moderate(&self, target: ReportTarget, status: ModerationStatus) -> Result<u64>;
}

#[async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Fails with `AlreadyExists` when already on the list
    async fn add(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<LibraryEntry>;

    async fn remove(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<bool>;

    /// Newest first
    async fn list(
        &self,
        kind: ListKind,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<LibraryEntry>>;

    async fn contains(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<bool>;

    async fn count_for_content(&self, kind: ListKind, content_id: Uuid) -> Result<i64>;

    async fn count_for_user(&self, kind: ListKind, user_id: Uuid) -> Result<i64>;
}

/// The full set of collaborators, wired to one backend
#[derive(Clone)]
pub struct Store {
    pub contents: Arc<dyn ContentLookup>,
    pub users: Arc<dyn UserDirectory>,
    pub audit: Arc<dyn AuditSink>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub episode_reviews: Arc<dyn EpisodeReviewRepository>,
    pub replies: Arc<dyn ReplyRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub library: Arc<dyn LibraryRepository>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            contents: Arc::new(catalog::PgContentLookup::new(pool.clone())),
            users: Arc::new(catalog::PgUserDirectory::new(pool.clone())),
            audit: Arc::new(audit::PgAuditSink::new(pool.clone())),
            reviews: Arc::new(reviews::PgReviewRepository::new(pool.clone())),
            episode_reviews: Arc::new(episode_reviews::PgEpisodeReviewRepository::new(
                pool.clone(),
            )),
            replies: Arc::new(replies::PgReplyRepository::new(pool.clone())),
            reports: Arc::new(reports::PgReportRepository::new(pool.clone())),
            library: Arc::new(library::PgLibraryRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            contents: store.clone(),
            users: store.clone(),
            audit: store.clone(),
            reviews: store.clone(),
            episode_reviews: store.clone(),
            replies: store.clone(),
            reports: store.clone(),
            library: store,
        }
    }

    /// Same store with a different audit sink
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }
}

/// Zero-fill a grouped count for every requested id
pub(crate) fn zero_filled(ids: &[Uuid], rows: impl IntoIterator<Item = (Uuid, i64)>) -> HashMap<Uuid, i64> {
    let mut counts: HashMap<Uuid, i64> = ids.iter().map(|id| (*id, 0)).collect();
    for (id, count) in rows {
        if let Some(slot) = counts.get_mut(&id) {
            *slot = count;
        }
    }
    counts
}
