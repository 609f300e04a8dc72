mod common;

use common::Harness;
use review_service::error::AppError;
use review_service::models::reply::{CreateReply, ReplyPatch};
use review_service::models::report::CreateReport;
use review_service::models::{
    Actor, ModerationStatus, PageRequest, ParentFilter, ReplyFilter, ReportType, ReviewReply,
};
use uuid::Uuid;

fn on_review(review_id: Uuid, parent: Option<Uuid>, text: &str) -> CreateReply {
    CreateReply {
        content: text.to_string(),
        review_id: Some(review_id),
        episode_review_id: None,
        parent_reply_id: parent,
    }
}

async fn reply(h: &Harness, user: Uuid, review_id: Uuid, parent: Option<Uuid>) -> ReviewReply {
    h.services
        .replies
        .create_reply(user, on_review(review_id, parent, "agreed"))
        .await
        .unwrap()
}

async fn report_reply(h: &Harness, reporter: Uuid, reply_id: Uuid) {
    h.services
        .moderation
        .create_report(
            reporter,
            CreateReport {
                report_type: ReportType::ReviewReply,
                target_id: reply_id,
                reason: "spam".into(),
                details: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reply_needs_exactly_one_target() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 4).await;
    let episode_review = h.episode_review(h.alice).await;

    let both = CreateReply {
        content: "hello".into(),
        review_id: Some(review.id),
        episode_review_id: Some(episode_review.id),
        parent_reply_id: None,
    };
    let neither = CreateReply {
        content: "hello".into(),
        review_id: None,
        episode_review_id: None,
        parent_reply_id: None,
    };

    for input in [both, neither] {
        let err = h.services.replies.create_reply(h.bob, input).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
    assert_eq!(h.memory.reply_count().await, 0);
}

#[tokio::test]
async fn test_reply_to_missing_review_is_not_found() {
    let h = Harness::new().await;
    let err = h
        .services
        .replies
        .create_reply(h.bob, on_review(Uuid::new_v4(), None, "anyone?"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_parent_must_share_the_target() {
    let h = Harness::new().await;
    let heat = h.review(h.alice, h.movie, 4).await;
    let wire = h.review(h.alice, h.series, 5).await;
    let parent = reply(&h, h.bob, heat.id, None).await;

    let err = h
        .services
        .replies
        .create_reply(h.alice, on_review(wire.id, Some(parent.id), "wrong thread"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = h
        .services
        .replies
        .create_reply(h.alice, on_review(heat.id, Some(Uuid::new_v4()), "ghost parent"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let nested = reply(&h, h.alice, heat.id, Some(parent.id)).await;
    assert_eq!(nested.parent_reply_id, Some(parent.id));
    assert_eq!(nested.review_id, Some(heat.id));
}

#[tokio::test]
async fn test_reply_on_episode_review() {
    let h = Harness::new().await;
    let episode_review = h.episode_review(h.alice).await;

    let created = h
        .services
        .replies
        .create_reply(
            h.bob,
            CreateReply {
                content: "Best pilot ever".into(),
                review_id: None,
                episode_review_id: Some(episode_review.id),
                parent_reply_id: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(created.review_id, None);
    assert_eq!(
        h.services
            .replies
            .count_replies_for_episode_review(episode_review.id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_deleting_a_reply_removes_its_whole_subtree() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 4).await;

    // root -> child -> grandchild -> great-grandchild, plus a sibling of root
    let root = reply(&h, h.bob, review.id, None).await;
    let child = reply(&h, h.alice, review.id, Some(root.id)).await;
    let grandchild = reply(&h, h.bob, review.id, Some(child.id)).await;
    let great = reply(&h, h.alice, review.id, Some(grandchild.id)).await;
    let sibling = reply(&h, h.alice, review.id, None).await;

    report_reply(&h, h.alice, grandchild.id).await;
    report_reply(&h, h.bob, sibling.id).await;
    assert_eq!(h.memory.report_count().await, 2);

    h.services
        .replies
        .delete_reply(root.id, Actor::User(h.bob))
        .await
        .unwrap();

    for gone in [root.id, child.id, grandchild.id, great.id] {
        assert!(matches!(
            h.services.replies.get_reply(gone).await,
            Err(AppError::NotFound(_))
        ));
    }
    assert!(h.services.replies.get_reply(sibling.id).await.is_ok());
    assert_eq!(h.memory.reply_count().await, 1);
    // Only the report on the sibling survives.
    assert_eq!(h.memory.report_count().await, 1);

    let log = h.memory.audit_log().await;
    let last = log.last().unwrap();
    assert_eq!(last.action, "DELETE_REPLY");
    assert!(last.description.contains("and 3 nested replies"));
}

#[tokio::test]
async fn test_only_author_or_admin_can_change_a_reply() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 4).await;
    let r = reply(&h, h.bob, review.id, None).await;

    let err = h
        .services
        .replies
        .update_reply(r.id, ReplyPatch { content: "mine now".into() }, Actor::User(h.alice))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let updated = h
        .services
        .replies
        .update_reply(r.id, ReplyPatch { content: "edited".into() }, Actor::User(h.bob))
        .await
        .unwrap();
    assert_eq!(updated.content, "edited");

    assert!(h.services.replies.is_reply_owner(r.id, h.bob).await.unwrap());
    assert!(!h.services.replies.is_reply_owner(r.id, h.alice).await.unwrap());

    h.services
        .replies
        .delete_reply(r.id, Actor::Admin(h.admin))
        .await
        .unwrap();
    assert_eq!(h.memory.reply_count().await, 0);
}

#[tokio::test]
async fn test_counts_are_zero_filled() {
    let h = Harness::new().await;
    let busy = h.review(h.alice, h.movie, 4).await;
    let quiet = h.review(h.bob, h.movie, 2).await;
    let top = reply(&h, h.bob, busy.id, None).await;
    reply(&h, h.alice, busy.id, None).await;
    reply(&h, h.alice, busy.id, Some(top.id)).await;

    let unknown = Uuid::new_v4();
    let counts = h
        .services
        .replies
        .reply_counts_for_reviews(&[busy.id, quiet.id, unknown])
        .await
        .unwrap();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts[&busy.id], 3);
    assert_eq!(counts[&quiet.id], 0);
    assert_eq!(counts[&unknown], 0);

    let per_reply = h
        .services
        .replies
        .reply_counts_for_replies(&[top.id])
        .await
        .unwrap();
    assert_eq!(per_reply[&top.id], 1);
    assert_eq!(
        h.services.replies.count_replies_for_reply(top.id).await.unwrap(),
        1
    );
    assert_eq!(
        h.services.replies.count_replies_for_review(quiet.id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_listing_by_position_in_tree() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 4).await;
    let top = reply(&h, h.bob, review.id, None).await;
    reply(&h, h.alice, review.id, Some(top.id)).await;
    reply(&h, h.alice, review.id, Some(top.id)).await;

    let roots = h
        .services
        .replies
        .find_replies(
            ReplyFilter {
                review_id: Some(review.id),
                parent: ParentFilter::Root,
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(roots.total, 1);
    assert_eq!(roots.items[0].reply.id, top.id);
    assert_eq!(roots.items[0].reply_count, 2);
    assert_eq!(roots.items[0].user.as_ref().unwrap().username, "bob");

    let children = h
        .services
        .replies
        .find_replies(
            ReplyFilter {
                parent: ParentFilter::Children(top.id),
                ..Default::default()
            },
            PageRequest::new(Some(1), Some(1)),
        )
        .await
        .unwrap();
    assert_eq!(children.total, 2);
    assert_eq!(children.items.len(), 1);
}

#[tokio::test]
async fn test_banned_reply_is_hidden_until_unbanned() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 4).await;
    let r = reply(&h, h.bob, review.id, None).await;
    let filter = ReplyFilter {
        review_id: Some(review.id),
        ..Default::default()
    };

    h.services
        .moderation
        .ban_item("REVIEW_REPLY", r.id, h.admin)
        .await
        .unwrap();

    let visible = h
        .services
        .replies
        .find_replies(filter.clone(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(visible.total, 0);
    assert_eq!(
        h.services.replies.count_replies_for_review(review.id).await.unwrap(),
        0
    );

    let banned = h
        .services
        .replies
        .find_replies(
            ReplyFilter {
                status: Some(ModerationStatus::Banned),
                ..filter.clone()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(banned.total, 1);

    h.services
        .moderation
        .unban_item("review-reply", r.id, h.admin)
        .await
        .unwrap();
    let restored = h
        .services
        .replies
        .find_replies(filter, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(restored.total, 1);
}

#[tokio::test]
async fn test_deleting_a_review_takes_its_thread_along() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 4).await;
    let top = reply(&h, h.bob, review.id, None).await;
    reply(&h, h.alice, review.id, Some(top.id)).await;
    report_reply(&h, h.alice, top.id).await;

    let other = h.review(h.bob, h.movie, 3).await;
    reply(&h, h.alice, other.id, None).await;

    h.services
        .reviews
        .delete_review(review.id, Actor::User(h.alice))
        .await
        .unwrap();

    assert_eq!(h.memory.reply_count().await, 1);
    assert_eq!(h.memory.report_count().await, 0);
}
