/// Moderation service - user reports and the admin actions on them
///
/// Reports move `PENDING -> APPROVED | REJECTED` and never back. Banning is
/// a separate switch on the reported item itself; a ban also approves the
/// item's pending reports, an unban leaves reports alone.
use super::audit::AuditLogger;
use super::email::{EmailSender, ModerationAction, ModerationNotice};
use crate::db::{
    ContentLookup, EpisodeReviewRepository, ReplyRepository, ReportRepository, ReviewRepository,
    Store, UserDirectory,
};
use crate::error::{AppError, Result};
use crate::models::reply::ReplyAttachment;
use crate::models::report::{CreateReport, ModerationOutcome, ReportView, ReportedItem};
use crate::models::{
    AuditAction, ModerationStatus, Page, PageRequest, Report, ReportFilter, ReportStatus,
    ReportTarget, ReportType, UserSummary,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct ModerationService {
    reports: Arc<dyn ReportRepository>,
    reviews: Arc<dyn ReviewRepository>,
    episode_reviews: Arc<dyn EpisodeReviewRepository>,
    replies: Arc<dyn ReplyRepository>,
    contents: Arc<dyn ContentLookup>,
    users: Arc<dyn UserDirectory>,
    email: Arc<dyn EmailSender>,
    audit: AuditLogger,
    app_base_url: String,
}

impl ModerationService {
    pub fn new(
        store: &Store,
        email: Arc<dyn EmailSender>,
        audit: AuditLogger,
        app_base_url: impl Into<String>,
    ) -> Self {
        let app_base_url: String = app_base_url.into();
        Self {
            reports: store.reports.clone(),
            reviews: store.reviews.clone(),
            episode_reviews: store.episode_reviews.clone(),
            replies: store.replies.clone(),
            contents: store.contents.clone(),
            users: store.users.clone(),
            email,
            audit,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create_report(&self, reporter_id: Uuid, input: CreateReport) -> Result<Report> {
        let outcome = self.try_create_report(reporter_id, &input).await;
        self.audit
            .record_outcome(AuditAction::CreateReport, reporter_id, &outcome, "create report")
            .await;
        outcome.map(|(report, _)| report)
    }

    async fn try_create_report(
        &self,
        reporter_id: Uuid,
        input: &CreateReport,
    ) -> Result<(Report, String)> {
        input.validate()?;
        let target = ReportTarget::new(input.report_type, input.target_id);
        self.load_item(target).await?;

        let report = self.reports.create(reporter_id, input).await?;
        tracing::info!(
            report_id = %report.id,
            report_type = report.report_type.as_str(),
            target_id = %report.target_id,
            reporter_id = %reporter_id,
            "Report created"
        );

        let description = format!(
            "Reported {} {}: {}",
            input.report_type.label(),
            input.target_id,
            input.reason
        );
        Ok((report, description))
    }

    /// Admin listing: status/type filtered in the store, then searched,
    /// sorted and paged here. Only the returned page gets its targets loaded.
    pub async fn find_all_reports(
        &self,
        filter: ReportFilter,
        page: PageRequest,
    ) -> Result<Page<ReportView>> {
        let reports = self.reports.list(&filter).await?;
        let reporters = self.reporters(&reports).await?;

        let mut views: Vec<ReportView> = reports
            .into_iter()
            .map(|report| ReportView {
                reporter: reporters.get(&report.reporter_id).cloned(),
                target: None,
                report,
            })
            .collect();

        if let Some(needle) = filter.search.as_deref() {
            views.retain(|v| v.matches_search(needle));
        }
        filter.sort.sort_slice(&mut views);

        let mut page = Page::slice(views, page);
        self.attach_targets(&mut page.items).await?;
        Ok(page)
    }

    pub async fn get_report(&self, id: Uuid) -> Result<ReportView> {
        let report = self
            .reports
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Report", id))?;
        let reporter = self.users.find_user(report.reporter_id).await?;

        let mut views = vec![ReportView {
            report,
            reporter,
            target: None,
        }];
        self.attach_targets(&mut views).await?;
        views.pop().ok_or_else(|| AppError::not_found("Report", id))
    }

    /// Hide an item and approve its pending reports, then tell the author
    pub async fn ban_item(
        &self,
        item_type: &str,
        id: Uuid,
        admin_id: Uuid,
    ) -> Result<ModerationOutcome> {
        let outcome = self
            .try_moderate(item_type, id, ModerationAction::Ban)
            .await;
        self.audit
            .record_outcome(AuditAction::BanContent, admin_id, &outcome, "ban content")
            .await;
        outcome.map(|(result, _)| result)
    }

    /// Make a banned item visible again; reports keep their status
    pub async fn unban_item(
        &self,
        item_type: &str,
        id: Uuid,
        admin_id: Uuid,
    ) -> Result<ModerationOutcome> {
        let outcome = self
            .try_moderate(item_type, id, ModerationAction::Unban)
            .await;
        self.audit
            .record_outcome(AuditAction::UnbanContent, admin_id, &outcome, "unban content")
            .await;
        outcome.map(|(result, _)| result)
    }

    async fn try_moderate(
        &self,
        item_type: &str,
        id: Uuid,
        action: ModerationAction,
    ) -> Result<(ModerationOutcome, String)> {
        let report_type = ReportType::from_path_segment(item_type)?;
        let target = ReportTarget::new(report_type, id);
        let item = self.load_item(target).await?;

        // The author must be reachable before anything changes.
        let author = self
            .users
            .find_user(item.author_id())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Author of {} {} not found", report_type.label(), id))
            })?;
        let recipient = author.email.clone().ok_or_else(|| {
            AppError::NotFound(format!(
                "Author of {} {} has no email address",
                report_type.label(),
                id
            ))
        })?;

        let status = match action {
            ModerationAction::Ban => ModerationStatus::Banned,
            ModerationAction::Unban => ModerationStatus::Active,
        };
        let approved_reports = self.reports.moderate(target, status).await?;
        tracing::info!(
            report_type = report_type.as_str(),
            target_id = %id,
            status = status.as_str(),
            approved_reports,
            "Moderation status changed"
        );

        if let Err(e) = self
            .notify_author(action, report_type, &item, &author, &recipient)
            .await
        {
            tracing::warn!(
                report_type = report_type.as_str(),
                target_id = %id,
                error = %e,
                "Failed to send moderation email"
            );
        }

        let description = match action {
            ModerationAction::Ban if approved_reports > 0 => format!(
                "Banned {} {} and approved {} pending reports",
                report_type.label(),
                id,
                approved_reports
            ),
            ModerationAction::Ban => format!("Banned {} {}", report_type.label(), id),
            ModerationAction::Unban => format!("Unbanned {} {}", report_type.label(), id),
        };

        Ok((
            ModerationOutcome {
                report_type,
                target_id: id,
                status,
                approved_reports,
            },
            description,
        ))
    }

    pub async fn approve_item(&self, report_id: Uuid, admin_id: Uuid) -> Result<Report> {
        let outcome = self
            .try_transition(report_id, ReportStatus::Approved)
            .await;
        self.audit
            .record_outcome(AuditAction::ApproveReport, admin_id, &outcome, "approve report")
            .await;
        outcome.map(|(report, _)| report)
    }

    pub async fn reject_item(&self, report_id: Uuid, admin_id: Uuid) -> Result<Report> {
        let outcome = self
            .try_transition(report_id, ReportStatus::Rejected)
            .await;
        self.audit
            .record_outcome(AuditAction::RejectReport, admin_id, &outcome, "reject report")
            .await;
        outcome.map(|(report, _)| report)
    }

    /// Decide a PENDING report. The reported item itself is not touched.
    async fn try_transition(&self, report_id: Uuid, to: ReportStatus) -> Result<(Report, String)> {
        let current = self
            .reports
            .find(report_id)
            .await?
            .ok_or_else(|| AppError::not_found("Report", report_id))?;
        if !current.status.can_transition_to(to) {
            return Err(AppError::InvalidInput(format!(
                "Report {} is already {}",
                report_id,
                current.status.as_str()
            )));
        }

        let report = self
            .reports
            .transition(report_id, ReportStatus::Pending, to)
            .await?
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Report {} was decided concurrently", report_id))
            })?;
        tracing::info!(report_id = %report_id, status = to.as_str(), "Report decided");

        let description = format!(
            "Marked report {} on {} {} as {}",
            report_id,
            report.report_type.label(),
            report.target_id,
            to.as_str()
        );
        Ok((report, description))
    }

    pub async fn delete_report(&self, report_id: Uuid, admin_id: Uuid) -> Result<()> {
        let outcome = self.try_delete_report(report_id).await;
        self.audit
            .record_outcome(AuditAction::DeleteReport, admin_id, &outcome, "delete report")
            .await;
        outcome.map(|_| ())
    }

    async fn try_delete_report(&self, report_id: Uuid) -> Result<((), String)> {
        if !self.reports.delete(report_id).await? {
            return Err(AppError::not_found("Report", report_id));
        }
        tracing::info!(report_id = %report_id, "Report deleted");
        Ok(((), format!("Deleted report {}", report_id)))
    }

    async fn load_item(&self, target: ReportTarget) -> Result<ReportedItem> {
        let item = match target {
            ReportTarget::Review(id) => self.reviews.find(id).await?.map(ReportedItem::Review),
            ReportTarget::EpisodeReview(id) => self
                .episode_reviews
                .find(id)
                .await?
                .map(ReportedItem::EpisodeReview),
            ReportTarget::Reply(id) => self.replies.find(id).await?.map(ReportedItem::Reply),
        };
        item.ok_or_else(|| {
            let label = target.report_type().label();
            AppError::not_found(&capitalize(label), target.id())
        })
    }

    async fn reporters(&self, reports: &[Report]) -> Result<HashMap<Uuid, UserSummary>> {
        let mut ids: Vec<Uuid> = reports.iter().map(|r| r.reporter_id).collect();
        ids.sort_unstable();
        ids.dedup();
        self.users.find_users(&ids).await
    }

    /// One batched lookup per target type
    async fn attach_targets(&self, views: &mut [ReportView]) -> Result<()> {
        let ids_of = |t: ReportType| -> Vec<Uuid> {
            views
                .iter()
                .filter(|v| v.report.report_type == t)
                .map(|v| v.report.target_id)
                .collect()
        };
        let review_ids = ids_of(ReportType::Review);
        let episode_review_ids = ids_of(ReportType::EpisodeReview);
        let reply_ids = ids_of(ReportType::ReviewReply);

        let mut items: HashMap<ReportTarget, ReportedItem> = HashMap::new();
        if !review_ids.is_empty() {
            for r in self.reviews.find_many(&review_ids).await? {
                items.insert(ReportTarget::Review(r.id), ReportedItem::Review(r));
            }
        }
        if !episode_review_ids.is_empty() {
            for r in self.episode_reviews.find_many(&episode_review_ids).await? {
                items.insert(ReportTarget::EpisodeReview(r.id), ReportedItem::EpisodeReview(r));
            }
        }
        if !reply_ids.is_empty() {
            for r in self.replies.find_many(&reply_ids).await? {
                items.insert(ReportTarget::Reply(r.id), ReportedItem::Reply(r));
            }
        }

        for view in views.iter_mut() {
            view.target = items.get(&view.report.target()).cloned();
        }
        Ok(())
    }

    async fn notify_author(
        &self,
        action: ModerationAction,
        item_type: ReportType,
        item: &ReportedItem,
        author: &UserSummary,
        recipient: &str,
    ) -> Result<()> {
        let (context, link) = match self.content_of(item).await? {
            Some(content_id) => {
                let context = self
                    .contents
                    .find_content(content_id)
                    .await?
                    .map(|c| c.describe());
                let link = self.contents.media_ref(content_id).await?.map(|media| {
                    format!(
                        "{}/{}/{}",
                        self.app_base_url,
                        media.kind.path_segment(),
                        media.id
                    )
                });
                (context, link)
            }
            None => (None, None),
        };

        let notice = ModerationNotice {
            action,
            item: item_type,
            username: author.username.clone(),
            context,
            link,
        };
        self.email
            .send_email(recipient, &notice.subject(), &notice.html())
            .await
    }

    /// Movie or series the item was ultimately written about
    async fn content_of(&self, item: &ReportedItem) -> Result<Option<Uuid>> {
        let episode_review_id = match item {
            ReportedItem::Review(r) => return Ok(Some(r.content_id)),
            ReportedItem::EpisodeReview(r) => {
                return Ok(self
                    .contents
                    .find_episode(r.episode_id)
                    .await?
                    .map(|e| e.content_id))
            }
            ReportedItem::Reply(reply) => match reply.attachment() {
                Some(ReplyAttachment::Review(id)) => {
                    return Ok(self.reviews.find(id).await?.map(|r| r.content_id))
                }
                Some(ReplyAttachment::EpisodeReview(id)) => id,
                None => return Ok(None),
            },
        };

        match self.episode_reviews.find(episode_review_id).await? {
            Some(review) => Ok(self
                .contents
                .find_episode(review.episode_id)
                .await?
                .map(|e| e.content_id)),
            None => Ok(None),
        }
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::review::CreateReview;

    mockall::mock! {
        pub Mailer {}

        #[async_trait::async_trait]
        impl EmailSender for Mailer {
            async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
        }
    }

    async fn setup(mailer: MockMailer) -> (Arc<MemoryStore>, ModerationService, Uuid) {
        let memory = Arc::new(MemoryStore::new());
        let author = memory.add_user("mara", Some("mara@nova.dev")).await;
        let movie = memory.add_movie("Heat").await;
        let review = ReviewRepository::create(
            memory.as_ref(),
            author,
            &CreateReview {
                content_id: movie,
                content_reviewed: "Slow first act".into(),
                rating: 3,
            },
        )
        .await
        .unwrap();

        let store = Store::memory(memory.clone());
        let audit = AuditLogger::new(store.audit.clone());
        let service =
            ModerationService::new(&store, Arc::new(mailer), audit, "https://app.nova.dev/");
        (memory, service, review.id)
    }

    #[tokio::test]
    async fn test_ban_emails_author_with_title_link() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_email()
            .withf(|to, subject, html| {
                to == "mara@nova.dev"
                    && subject == "Your review has been removed"
                    && html.contains("https://app.nova.dev/movies/")
                    && html.contains("movie &quot;Heat&quot;")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (_, service, review_id) = setup(mailer).await;
        let outcome = service
            .ban_item("REVIEW", review_id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(outcome.status, ModerationStatus::Banned);
    }

    #[tokio::test]
    async fn test_email_failure_does_not_fail_the_ban() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_email()
            .times(1)
            .returning(|_, _, _| Err(AppError::Unexpected("smtp down".into())));

        let (memory, service, review_id) = setup(mailer).await;
        service
            .ban_item("review", review_id, Uuid::new_v4())
            .await
            .unwrap();

        let review = ReviewRepository::find(memory.as_ref(), review_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(review.status, ModerationStatus::Banned);

        let log = memory.audit_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, "BAN_CONTENT");
    }

    #[tokio::test]
    async fn test_unknown_type_sends_nothing() {
        let mut mailer = MockMailer::new();
        mailer.expect_send_email().never();

        let (memory, service, review_id) = setup(mailer).await;
        let err = service
            .unban_item("movie", review_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let log = memory.audit_log().await;
        assert_eq!(log.len(), 1);
        assert!(log[0].description.starts_with("Failed to unban content"));
    }

    #[test]
    fn test_capitalize_labels() {
        assert_eq!(capitalize("episode review"), "Episode review");
        assert_eq!(capitalize(""), "");
    }
}
