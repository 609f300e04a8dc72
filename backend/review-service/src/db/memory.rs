//! In-process store implementing every persistence trait.
//!
//! The whole state sits behind one `RwLock`; each trait method holds its
//! guard for the full call, so every mutation is atomic the way a
//! PostgreSQL transaction is. Uniqueness rules and cascades mirror the
//! schema in `migrations/`.

use super::{
    zero_filled, AuditSink, ContentLookup, EpisodeReviewRepository, LibraryRepository,
    ReplyRepository, ReportRepository, ReviewRepository, UserDirectory,
};
use crate::error::{AppError, Result};
use crate::models::pagination::Sortable;
use crate::models::reply::{ReplyAttachment, ReplyParent};
use crate::models::report::CreateReport;
use crate::models::review::{mean_rating, CreateEpisodeReview, CreateReview, ReviewPatch};
use crate::models::{
    AuditEntry, AuditLog, ContentKind, ContentSummary, Episode, EpisodeReview,
    EpisodeReviewFilter, LibraryEntry, ListKind, MediaRef, ModerationStatus, Page, PageRequest,
    ReplyFilter, ReplySubtree, Report, ReportFilter, ReportStatus, ReportTarget, ReportType,
    Review, ReviewFilter, ReviewReply, Sort, UserSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserSummary>,
    contents: HashMap<Uuid, ContentSummary>,
    media: HashMap<Uuid, MediaRef>,
    episodes: HashMap<Uuid, Episode>,
    reviews: HashMap<Uuid, Review>,
    episode_reviews: HashMap<Uuid, EpisodeReview>,
    replies: HashMap<Uuid, ReviewReply>,
    reports: HashMap<Uuid, Report>,
    favorites: HashMap<(Uuid, Uuid), LibraryEntry>,
    watchlist: HashMap<(Uuid, Uuid), LibraryEntry>,
    audit_log: Vec<AuditLog>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing clock so "newest first" is deterministic
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn recompute_avg_rating(&mut self, content_id: Uuid) {
        let avg = mean_rating(
            self.reviews
                .values()
                .filter(|r| r.content_id == content_id)
                .map(|r| r.rating),
        );
        if let Some(content) = self.contents.get_mut(&content_id) {
            content.avg_rating = avg;
        }
    }

    fn remove_reports(&mut self, report_type: ReportType, targets: &HashSet<Uuid>) -> usize {
        let before = self.reports.len();
        self.reports
            .retain(|_, r| !(r.report_type == report_type && targets.contains(&r.target_id)));
        before - self.reports.len()
    }

    /// Drop every reply matching `pred` plus the reports on them
    fn remove_replies_where(&mut self, pred: impl Fn(&ReviewReply) -> bool) -> usize {
        let ids: HashSet<Uuid> = self
            .replies
            .values()
            .filter(|r| pred(r))
            .map(|r| r.id)
            .collect();
        self.remove_reports(ReportType::ReviewReply, &ids);
        self.replies.retain(|id, _| !ids.contains(id));
        ids.len()
    }

    fn library(&self, kind: ListKind) -> &HashMap<(Uuid, Uuid), LibraryEntry> {
        match kind {
            ListKind::Favorites => &self.favorites,
            ListKind::Watchlist => &self.watchlist,
        }
    }

    fn library_mut(&mut self, kind: ListKind) -> &mut HashMap<(Uuid, Uuid), LibraryEntry> {
        match kind {
            ListKind::Favorites => &mut self.favorites,
            ListKind::Watchlist => &mut self.watchlist,
        }
    }
}

fn sorted_page<T: Sortable>(
    items: impl Iterator<Item = T>,
    sort: &Sort,
    page: PageRequest,
) -> Page<T> {
    let mut items: Vec<T> = items.collect();
    sort.sort_slice(&mut items);
    Page::slice(items, page)
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str, email: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().await.users.insert(
            id,
            UserSummary {
                id,
                username: username.to_string(),
                email: email.map(str::to_string),
            },
        );
        id
    }

    pub async fn add_movie(&self, title: &str) -> Uuid {
        self.add_content(title, ContentKind::Movie).await
    }

    pub async fn add_series(&self, title: &str) -> Uuid {
        self.add_content(title, ContentKind::TvSeries).await
    }

    async fn add_content(&self, title: &str, kind: ContentKind) -> Uuid {
        let mut state = self.state.write().await;
        let id = Uuid::new_v4();
        let created_at = state.now();
        state.contents.insert(
            id,
            ContentSummary {
                id,
                title: title.to_string(),
                kind,
                avg_rating: 0.0,
                created_at,
            },
        );
        state.media.insert(
            id,
            MediaRef {
                kind,
                id: Uuid::new_v4(),
            },
        );
        id
    }

    pub async fn add_episode(&self, content_id: Uuid, season: i32, number: i32, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().await.episodes.insert(
            id,
            Episode {
                id,
                content_id,
                season_number: season,
                episode_number: number,
                title: title.to_string(),
            },
        );
        id
    }

    /// Stored aggregate, as the catalog would serve it
    pub async fn avg_rating(&self, content_id: Uuid) -> Option<f64> {
        self.state
            .read()
            .await
            .contents
            .get(&content_id)
            .map(|c| c.avg_rating)
    }

    pub async fn audit_log(&self) -> Vec<AuditLog> {
        self.state.read().await.audit_log.clone()
    }

    pub async fn reply_count(&self) -> usize {
        self.state.read().await.replies.len()
    }

    pub async fn report_count(&self) -> usize {
        self.state.read().await.reports.len()
    }
}

#[async_trait]
impl ContentLookup for MemoryStore {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentSummary>> {
        Ok(self.state.read().await.contents.get(&id).cloned())
    }

    async fn find_contents(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ContentSummary>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.contents.get(id).map(|c| (*id, c.clone())))
            .collect())
    }

    async fn media_ref(&self, content_id: Uuid) -> Result<Option<MediaRef>> {
        Ok(self.state.read().await.media.get(&content_id).copied())
    }

    async fn find_episode(&self, id: Uuid) -> Result<Option<Episode>> {
        Ok(self.state.read().await.episodes.get(&id).cloned())
    }

    async fn find_episodes(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Episode>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.episodes.get(id).map(|e| (*id, e.clone())))
            .collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn log(&self, entry: AuditEntry) -> Result<()> {
        let mut state = self.state.write().await;
        let created_at = state.now();
        state.audit_log.push(AuditLog {
            id: Uuid::new_v4(),
            action: entry.action.as_str().to_string(),
            user_id: entry.user_id,
            description: entry.description,
            created_at,
        });
        Ok(())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn create(&self, user_id: Uuid, input: &CreateReview) -> Result<Review> {
        let mut state = self.state.write().await;
        if !state.contents.contains_key(&input.content_id) {
            return Err(AppError::not_found("Content", input.content_id));
        }
        let now = state.now();
        let review = Review {
            id: Uuid::new_v4(),
            content_reviewed: input.content_reviewed.clone(),
            rating: input.rating,
            content_id: input.content_id,
            user_id,
            status: ModerationStatus::Active,
            created_at: now,
            updated_at: now,
        };
        state.reviews.insert(review.id, review.clone());
        state.recompute_avg_rating(review.content_id);
        Ok(review)
    }

    async fn update(&self, id: Uuid, patch: &ReviewPatch) -> Result<Review> {
        let mut state = self.state.write().await;
        let now = state.now();
        let review = state
            .reviews
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Review", id))?;
        if let Some(text) = &patch.content_reviewed {
            review.content_reviewed = text.clone();
        }
        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        review.updated_at = now;
        let review = review.clone();
        state.recompute_avg_rating(review.content_id);
        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> Result<Review> {
        let mut state = self.state.write().await;
        let review = state
            .reviews
            .remove(&id)
            .ok_or_else(|| AppError::not_found("Review", id))?;
        state.remove_replies_where(|r| r.review_id == Some(id));
        state.remove_reports(ReportType::Review, &HashSet::from([id]));
        state.recompute_avg_rating(review.content_id);
        Ok(review)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(self.state.read().await.reviews.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Review>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.reviews.get(id).cloned()).collect())
    }

    async fn list(&self, filter: &ReviewFilter, page: PageRequest) -> Result<Page<Review>> {
        let state = self.state.read().await;
        Ok(sorted_page(
            state.reviews.values().filter(|r| filter.matches(r)).cloned(),
            &filter.sort,
            page,
        ))
    }
}

#[async_trait]
impl EpisodeReviewRepository for MemoryStore {
    async fn create(&self, user_id: Uuid, input: &CreateEpisodeReview) -> Result<EpisodeReview> {
        let mut state = self.state.write().await;
        if !state.episodes.contains_key(&input.episode_id) {
            return Err(AppError::not_found("Episode", input.episode_id));
        }
        if state
            .episode_reviews
            .values()
            .any(|r| r.user_id == user_id && r.episode_id == input.episode_id)
        {
            return Err(AppError::AlreadyExists(
                "You have already reviewed this episode".to_string(),
            ));
        }
        let now = state.now();
        let review = EpisodeReview {
            id: Uuid::new_v4(),
            content_reviewed: input.content_reviewed.clone(),
            rating: input.rating,
            episode_id: input.episode_id,
            user_id,
            status: ModerationStatus::Active,
            created_at: now,
            updated_at: now,
        };
        state.episode_reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn update(&self, id: Uuid, patch: &ReviewPatch) -> Result<EpisodeReview> {
        let mut state = self.state.write().await;
        let now = state.now();
        let review = state
            .episode_reviews
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Episode review", id))?;
        if let Some(text) = &patch.content_reviewed {
            review.content_reviewed = text.clone();
        }
        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        review.updated_at = now;
        Ok(review.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<EpisodeReview> {
        let mut state = self.state.write().await;
        let review = state
            .episode_reviews
            .remove(&id)
            .ok_or_else(|| AppError::not_found("Episode review", id))?;
        state.remove_replies_where(|r| r.episode_review_id == Some(id));
        state.remove_reports(ReportType::EpisodeReview, &HashSet::from([id]));
        Ok(review)
    }

    async fn find(&self, id: Uuid) -> Result<Option<EpisodeReview>> {
        Ok(self.state.read().await.episode_reviews.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<EpisodeReview>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.episode_reviews.get(id).cloned())
            .collect())
    }

    async fn list(
        &self,
        filter: &EpisodeReviewFilter,
        page: PageRequest,
    ) -> Result<Page<EpisodeReview>> {
        let state = self.state.read().await;
        Ok(sorted_page(
            state
                .episode_reviews
                .values()
                .filter(|r| filter.matches(r))
                .cloned(),
            &filter.sort,
            page,
        ))
    }
}

#[async_trait]
impl ReplyRepository for MemoryStore {
    async fn create(
        &self,
        user_id: Uuid,
        attachment: ReplyAttachment,
        parent_reply_id: Option<Uuid>,
        content: &str,
    ) -> Result<ReviewReply> {
        let mut state = self.state.write().await;
        if let Some(parent_id) = parent_reply_id {
            if !state.replies.contains_key(&parent_id) {
                return Err(AppError::not_found("Parent reply", parent_id));
            }
        }
        let now = state.now();
        let reply = ReviewReply {
            id: Uuid::new_v4(),
            content: content.to_string(),
            status: ModerationStatus::Active,
            user_id,
            review_id: attachment.review_id(),
            episode_review_id: attachment.episode_review_id(),
            parent_reply_id,
            created_at: now,
            updated_at: now,
        };
        state.replies.insert(reply.id, reply.clone());
        Ok(reply)
    }

    async fn update_content(&self, id: Uuid, content: &str) -> Result<ReviewReply> {
        let mut state = self.state.write().await;
        let now = state.now();
        let reply = state
            .replies
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Reply", id))?;
        reply.content = content.to_string();
        reply.updated_at = now;
        Ok(reply.clone())
    }

    async fn delete_subtree(&self, root: Uuid) -> Result<ReplySubtree> {
        let mut state = self.state.write().await;
        if !state.replies.contains_key(&root) {
            return Err(AppError::not_found("Reply", root));
        }

        let mut subtree = ReplySubtree::new(root);
        loop {
            let frontier: HashSet<Uuid> = subtree.frontier().iter().copied().collect();
            let children: Vec<Uuid> = state
                .replies
                .values()
                .filter(|r| r.parent_reply_id.map_or(false, |p| frontier.contains(&p)))
                .map(|r| r.id)
                .collect();
            if !subtree.push_level(children) {
                break;
            }
        }

        let ids: HashSet<Uuid> = subtree.ids().into_iter().collect();
        state.remove_reports(ReportType::ReviewReply, &ids);
        for level in subtree.deletion_order() {
            for id in level {
                state.replies.remove(id);
            }
        }
        Ok(subtree)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ReviewReply>> {
        Ok(self.state.read().await.replies.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<ReviewReply>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.replies.get(id).cloned()).collect())
    }

    async fn list(&self, filter: &ReplyFilter, page: PageRequest) -> Result<Page<ReviewReply>> {
        let state = self.state.read().await;
        Ok(sorted_page(
            state.replies.values().filter(|r| filter.matches(r)).cloned(),
            &filter.sort,
            page,
        ))
    }

    async fn count_active(&self, parent: ReplyParent, id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .replies
            .values()
            .filter(|r| r.status == ModerationStatus::Active && parent.key_of(r) == Some(id))
            .count() as i64)
    }

    async fn count_active_by(
        &self,
        parent: ReplyParent,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        let mut grouped: HashMap<Uuid, i64> = HashMap::new();
        for reply in state
            .replies
            .values()
            .filter(|r| r.status == ModerationStatus::Active)
        {
            if let Some(key) = parent.key_of(reply) {
                *grouped.entry(key).or_default() += 1;
            }
        }
        Ok(zero_filled(ids, grouped))
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn create(&self, reporter_id: Uuid, input: &CreateReport) -> Result<Report> {
        let mut state = self.state.write().await;
        if state.reports.values().any(|r| {
            r.reporter_id == reporter_id
                && r.report_type == input.report_type
                && r.target_id == input.target_id
        }) {
            return Err(AppError::AlreadyExists(
                "You have already reported this item".to_string(),
            ));
        }
        let created_at = state.now();
        let report = Report {
            id: Uuid::new_v4(),
            report_type: input.report_type,
            target_id: input.target_id,
            reason: input.reason.clone(),
            details: input.details.clone(),
            status: ReportStatus::Pending,
            reporter_id,
            created_at,
        };
        state.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.state.read().await.reports.get(&id).cloned())
    }

    async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let state = self.state.read().await;
        let mut reports: Vec<Report> = state
            .reports
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(reports)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
    ) -> Result<Option<Report>> {
        let mut state = self.state.write().await;
        Ok(match state.reports.get_mut(&id) {
            Some(report) if report.status == from => {
                report.status = to;
                Some(report.clone())
            }
            _ => None,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.reports.remove(&id).is_some())
    }

    async fn moderate(&self, target: ReportTarget, status: ModerationStatus) -> Result<u64> {
        let mut state = self.state.write().await;
        let now = state.now();
        let found = match target {
            ReportTarget::Review(id) => state.reviews.get_mut(&id).map(|r| {
                r.status = status;
                r.updated_at = now;
            }),
            ReportTarget::EpisodeReview(id) => state.episode_reviews.get_mut(&id).map(|r| {
                r.status = status;
                r.updated_at = now;
            }),
            ReportTarget::Reply(id) => state.replies.get_mut(&id).map(|r| {
                r.status = status;
                r.updated_at = now;
            }),
        };
        if found.is_none() {
            return Err(AppError::not_found(target.report_type().label(), target.id()));
        }

        if status != ModerationStatus::Banned {
            return Ok(0);
        }
        let mut approved = 0;
        for report in state.reports.values_mut().filter(|r| {
            r.report_type == target.report_type()
                && r.target_id == target.id()
                && r.status == ReportStatus::Pending
        }) {
            report.status = ReportStatus::Approved;
            approved += 1;
        }
        Ok(approved)
    }
}

#[async_trait]
impl LibraryRepository for MemoryStore {
    async fn add(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<LibraryEntry> {
        let mut state = self.state.write().await;
        if !state.contents.contains_key(&content_id) {
            return Err(AppError::not_found("Content", content_id));
        }
        let created_at = state.now();
        let list = state.library_mut(kind);
        if list.contains_key(&(user_id, content_id)) {
            return Err(AppError::AlreadyExists(format!(
                "Content is already in your {}",
                kind
            )));
        }
        let entry = LibraryEntry {
            user_id,
            content_id,
            created_at,
        };
        list.insert((user_id, content_id), entry.clone());
        Ok(entry)
    }

    async fn remove(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.library_mut(kind).remove(&(user_id, content_id)).is_some())
    }

    async fn list(
        &self,
        kind: ListKind,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<LibraryEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<LibraryEntry> = state
            .library(kind)
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.content_id.cmp(&b.content_id))
        });
        Ok(Page::slice(entries, page))
    }

    async fn contains(&self, kind: ListKind, user_id: Uuid, content_id: Uuid) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.library(kind).contains_key(&(user_id, content_id)))
    }

    async fn count_for_content(&self, kind: ListKind, content_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .library(kind)
            .keys()
            .filter(|(_, c)| *c == content_id)
            .count() as i64)
    }

    async fn count_for_user(&self, kind: ListKind, user_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .library(kind)
            .keys()
            .filter(|(u, _)| *u == user_id)
            .count() as i64)
    }
}
