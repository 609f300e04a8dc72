mod common;

use common::{Harness, APP_BASE_URL};
use review_service::error::AppError;
use review_service::models::report::CreateReport;
use review_service::models::{
    ModerationStatus, PageRequest, Report, ReportFilter, ReportStatus, ReportType, Sort,
};
use uuid::Uuid;

async fn report(h: &Harness, reporter: Uuid, report_type: ReportType, target: Uuid, reason: &str) -> Report {
    h.services
        .moderation
        .create_report(
            reporter,
            CreateReport {
                report_type,
                target_id: target,
                reason: reason.to_string(),
                details: None,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_report_lifecycle_is_one_way() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    let r = report(&h, h.bob, ReportType::Review, review.id, "spoilers").await;
    assert_eq!(r.status, ReportStatus::Pending);

    let approved = h.services.moderation.approve_item(r.id, h.admin).await.unwrap();
    assert_eq!(approved.status, ReportStatus::Approved);

    for err in [
        h.services.moderation.reject_item(r.id, h.admin).await.unwrap_err(),
        h.services.moderation.approve_item(r.id, h.admin).await.unwrap_err(),
    ] {
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    let stored = h.services.moderation.get_report(r.id).await.unwrap();
    assert_eq!(stored.report.status, ReportStatus::Approved);

    // Deciding a report never touches the review itself.
    let review = h.services.reviews.get_review(review.id).await.unwrap();
    assert_eq!(review.review.status, ModerationStatus::Active);
}

#[tokio::test]
async fn test_deciding_unknown_report_is_not_found() {
    let h = Harness::new().await;
    let missing = Uuid::new_v4();
    assert!(matches!(
        h.services.moderation.reject_item(missing, h.admin).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        h.services.moderation.delete_report(missing, h.admin).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_report_is_rejected() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    report(&h, h.bob, ReportType::Review, review.id, "spoilers").await;

    let err = h
        .services
        .moderation
        .create_report(
            h.bob,
            CreateReport {
                report_type: ReportType::Review,
                target_id: review.id,
                reason: "still spoilers".into(),
                details: Some("really".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists(_)));

    // Someone else may report the same review.
    report(&h, h.admin, ReportType::Review, review.id, "spoilers").await;
}

#[tokio::test]
async fn test_report_on_missing_item_is_not_found() {
    let h = Harness::new().await;
    let err = h
        .services
        .moderation
        .create_report(
            h.bob,
            CreateReport {
                report_type: ReportType::EpisodeReview,
                target_id: Uuid::new_v4(),
                reason: "gone".into(),
                details: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_ban_hides_item_approves_reports_and_emails_author() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    let first = report(&h, h.bob, ReportType::Review, review.id, "offensive").await;
    let second = report(&h, h.admin, ReportType::Review, review.id, "offensive").await;
    h.services
        .moderation
        .reject_item(second.id, h.admin)
        .await
        .unwrap();

    let outcome = h
        .services
        .moderation
        .ban_item("review", review.id, h.admin)
        .await
        .unwrap();
    assert_eq!(outcome.status, ModerationStatus::Banned);
    assert_eq!(outcome.approved_reports, 1);

    let first = h.services.moderation.get_report(first.id).await.unwrap();
    assert_eq!(first.report.status, ReportStatus::Approved);
    let second = h.services.moderation.get_report(second.id).await.unwrap();
    assert_eq!(second.report.status, ReportStatus::Rejected);

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@nova.dev");
    assert_eq!(sent[0].subject, "Your review has been removed");
    assert!(sent[0].html.contains("Hi alice"));
    assert!(sent[0].html.contains(&format!("{}/movies/", APP_BASE_URL)));
}

#[tokio::test]
async fn test_banned_review_stays_listed_for_content() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    h.services
        .moderation
        .ban_item("REVIEW", review.id, h.admin)
        .await
        .unwrap();

    let page = h
        .services
        .reviews
        .find_reviews(
            review_service::models::ReviewFilter {
                content_id: Some(h.movie),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].review.status, ModerationStatus::Banned);
}

#[tokio::test]
async fn test_unban_restores_without_touching_reports() {
    let h = Harness::new().await;
    let episode_review = h.episode_review(h.bob).await;

    h.services
        .moderation
        .ban_item("episode-review", episode_review.id, h.admin)
        .await
        .unwrap();
    let late = report(&h, h.alice, ReportType::EpisodeReview, episode_review.id, "rude").await;

    let outcome = h
        .services
        .moderation
        .unban_item("EPISODE_REVIEW", episode_review.id, h.admin)
        .await
        .unwrap();
    assert_eq!(outcome.status, ModerationStatus::Active);
    assert_eq!(outcome.approved_reports, 0);

    let late = h.services.moderation.get_report(late.id).await.unwrap();
    assert_eq!(late.report.status, ReportStatus::Pending);

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].to, "bob@nova.dev");
    assert_eq!(sent[1].subject, "Your episode review has been restored");
    assert!(sent[1].html.contains("/tv-series/"));
}

#[tokio::test]
async fn test_ban_without_author_email_changes_nothing() {
    let h = Harness::new().await;
    let silent = h.memory.add_user("silent", None).await;
    let review = h.review(silent, h.movie, 2).await;
    let pending = report(&h, h.bob, ReportType::Review, review.id, "spam").await;

    let err = h
        .services
        .moderation
        .ban_item("review", review.id, h.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let review = h.services.reviews.get_review(review.id).await.unwrap();
    assert_eq!(review.review.status, ModerationStatus::Active);
    let pending = h.services.moderation.get_report(pending.id).await.unwrap();
    assert_eq!(pending.report.status, ReportStatus::Pending);
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_ban_rejects_unknown_type_and_missing_item() {
    let h = Harness::new().await;
    assert!(matches!(
        h.services.moderation.ban_item("movie", Uuid::new_v4(), h.admin).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        h.services.moderation.ban_item("reply", Uuid::new_v4(), h.admin).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_report_listing_filters_searches_sorts_and_pages() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    let episode_review = h.episode_review(h.alice).await;

    report(&h, h.bob, ReportType::Review, review.id, "Spoilers in the first line").await;
    let harassment = report(&h, h.admin, ReportType::Review, review.id, "Harassment").await;
    report(&h, h.bob, ReportType::EpisodeReview, episode_review.id, "Advertising").await;
    h.services
        .moderation
        .reject_item(harassment.id, h.admin)
        .await
        .unwrap();

    let all = h
        .services
        .moderation
        .find_all_reports(ReportFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    // Newest first by default, each with its reporter and target attached.
    assert_eq!(all.items[0].report.reason, "Advertising");
    assert!(all.items.iter().all(|v| v.reporter.is_some() && v.target.is_some()));

    let pending_reviews = h
        .services
        .moderation
        .find_all_reports(
            ReportFilter {
                status: Some(ReportStatus::Pending),
                report_type: Some(ReportType::Review),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(pending_reviews.total, 1);
    assert_eq!(pending_reviews.items[0].report.reason, "Spoilers in the first line");

    let by_reporter = h
        .services
        .moderation
        .find_all_reports(
            ReportFilter {
                search: Some("MODERATOR".into()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_reporter.total, 1);
    assert_eq!(by_reporter.items[0].report.id, harassment.id);

    let by_reason = h
        .services
        .moderation
        .find_all_reports(
            ReportFilter {
                sort: Sort::parse(Some("reason:asc"), ReportFilter::SORTABLE).unwrap(),
                ..Default::default()
            },
            PageRequest::new(Some(2), Some(2)),
        )
        .await
        .unwrap();
    assert_eq!(by_reason.total, 3);
    assert_eq!(by_reason.page, 2);
    assert_eq!(by_reason.items.len(), 1);
    assert_eq!(by_reason.items[0].report.reason, "Spoilers in the first line");
}

#[tokio::test]
async fn test_delete_report() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    let r = report(&h, h.bob, ReportType::Review, review.id, "spam").await;

    h.services.moderation.delete_report(r.id, h.admin).await.unwrap();
    assert!(matches!(
        h.services.moderation.get_report(r.id).await,
        Err(AppError::NotFound(_))
    ));
    // A deleted report no longer blocks a fresh one.
    report(&h, h.bob, ReportType::Review, review.id, "spam again").await;
}
