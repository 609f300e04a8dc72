/// Reply service - threaded replies under reviews and episode reviews
use super::audit::AuditLogger;
use crate::db::{EpisodeReviewRepository, ReplyRepository, ReviewRepository, Store, UserDirectory};
use crate::error::{AppError, Result};
use crate::models::reply::{CreateReply, ReplyAttachment, ReplyPatch, ReplyView};
use crate::models::{
    Actor, AuditAction, ModerationStatus, Page, PageRequest, ReplyFilter, ReplyParent, ReviewReply,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct ReplyService {
    replies: Arc<dyn ReplyRepository>,
    reviews: Arc<dyn ReviewRepository>,
    episode_reviews: Arc<dyn EpisodeReviewRepository>,
    users: Arc<dyn UserDirectory>,
    audit: AuditLogger,
}

impl ReplyService {
    pub fn new(store: &Store, audit: AuditLogger) -> Self {
        Self {
            replies: store.replies.clone(),
            reviews: store.reviews.clone(),
            episode_reviews: store.episode_reviews.clone(),
            users: store.users.clone(),
            audit,
        }
    }

    pub async fn create_reply(&self, user_id: Uuid, input: CreateReply) -> Result<ReviewReply> {
        let outcome = self.try_create(user_id, &input).await;
        self.audit
            .record_outcome(AuditAction::CreateReply, user_id, &outcome, "create reply")
            .await;
        outcome.map(|(reply, _)| reply)
    }

    async fn try_create(&self, user_id: Uuid, input: &CreateReply) -> Result<(ReviewReply, String)> {
        input.validate()?;
        let attachment = ReplyAttachment::from_ids(input.review_id, input.episode_review_id)?;
        self.ensure_target_exists(attachment).await?;

        if let Some(parent_id) = input.parent_reply_id {
            let parent = self
                .replies
                .find(parent_id)
                .await?
                .ok_or_else(|| AppError::not_found("Parent reply", parent_id))?;
            if parent.attachment() != Some(attachment) {
                return Err(AppError::InvalidInput(
                    "Parent reply belongs to a different review".to_string(),
                ));
            }
        }

        let reply = self
            .replies
            .create(user_id, attachment, input.parent_reply_id, &input.content)
            .await?;
        tracing::info!(
            reply_id = %reply.id,
            user_id = %user_id,
            parent_reply_id = ?reply.parent_reply_id,
            "Reply created"
        );

        let description = match input.parent_reply_id {
            Some(parent_id) => format!("Created reply {} under reply {}", reply.id, parent_id),
            None => format!("Created reply {} on {}", reply.id, describe_attachment(attachment)),
        };
        Ok((reply, description))
    }

    /// Only the content can change; a reply never moves.
    pub async fn update_reply(&self, id: Uuid, patch: ReplyPatch, actor: Actor) -> Result<ReviewReply> {
        let outcome = self.try_update(id, &patch, actor).await;
        self.audit
            .record_outcome(AuditAction::UpdateReply, actor.id(), &outcome, "update reply")
            .await;
        outcome.map(|(reply, _)| reply)
    }

    async fn try_update(
        &self,
        id: Uuid,
        patch: &ReplyPatch,
        actor: Actor,
    ) -> Result<(ReviewReply, String)> {
        patch.validate()?;
        self.owned_reply(id, actor).await?;

        let reply = self.replies.update_content(id, &patch.content).await?;
        tracing::info!(reply_id = %id, "Reply updated");
        Ok((reply, format!("Updated reply {}", id)))
    }

    /// Delete a reply and everything beneath it
    pub async fn delete_reply(&self, id: Uuid, actor: Actor) -> Result<()> {
        let outcome = self.try_delete(id, actor).await;
        self.audit
            .record_outcome(AuditAction::DeleteReply, actor.id(), &outcome, "delete reply")
            .await;
        outcome.map(|_| ())
    }

    async fn try_delete(&self, id: Uuid, actor: Actor) -> Result<((), String)> {
        self.owned_reply(id, actor).await?;

        let subtree = self.replies.delete_subtree(id).await?;
        let descendants = subtree.descendants();
        tracing::info!(
            reply_id = %id,
            descendants,
            depth = subtree.depth(),
            "Reply subtree deleted"
        );

        let description = if descendants == 0 {
            format!("Deleted reply {}", id)
        } else {
            format!("Deleted reply {} and {} nested replies", id, descendants)
        };
        Ok(((), description))
    }

    /// Only ACTIVE replies unless the caller asks for a status. Each reply
    /// carries its direct ACTIVE child count.
    pub async fn find_replies(
        &self,
        mut filter: ReplyFilter,
        page: PageRequest,
    ) -> Result<Page<ReplyView>> {
        filter.status.get_or_insert(ModerationStatus::Active);

        let Page {
            items,
            total,
            page,
            limit,
        } = self.replies.list(&filter, page).await?;
        let items = self.hydrate(items).await?;
        Ok(Page {
            items,
            total,
            page,
            limit,
        })
    }

    pub async fn get_reply(&self, id: Uuid) -> Result<ReplyView> {
        let reply = self
            .replies
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Reply", id))?;
        let mut views = self.hydrate(vec![reply]).await?;
        views.pop().ok_or_else(|| AppError::not_found("Reply", id))
    }

    pub async fn is_reply_owner(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let reply = self
            .replies
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Reply", id))?;
        Ok(reply.user_id == user_id)
    }

    pub async fn count_replies_for_review(&self, review_id: Uuid) -> Result<i64> {
        self.replies.count_active(ReplyParent::Review, review_id).await
    }

    pub async fn count_replies_for_episode_review(&self, episode_review_id: Uuid) -> Result<i64> {
        self.replies
            .count_active(ReplyParent::EpisodeReview, episode_review_id)
            .await
    }

    pub async fn count_replies_for_reply(&self, reply_id: Uuid) -> Result<i64> {
        self.replies.count_active(ReplyParent::Reply, reply_id).await
    }

    pub async fn reply_counts_for_reviews(&self, review_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        self.replies
            .count_active_by(ReplyParent::Review, review_ids)
            .await
    }

    pub async fn reply_counts_for_episode_reviews(
        &self,
        episode_review_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        self.replies
            .count_active_by(ReplyParent::EpisodeReview, episode_review_ids)
            .await
    }

    pub async fn reply_counts_for_replies(&self, reply_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        self.replies
            .count_active_by(ReplyParent::Reply, reply_ids)
            .await
    }

    async fn ensure_target_exists(&self, attachment: ReplyAttachment) -> Result<()> {
        let exists = match attachment {
            ReplyAttachment::Review(id) => self.reviews.find(id).await?.is_some(),
            ReplyAttachment::EpisodeReview(id) => self.episode_reviews.find(id).await?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(match attachment {
                ReplyAttachment::Review(id) => AppError::not_found("Review", id),
                ReplyAttachment::EpisodeReview(id) => AppError::not_found("Episode review", id),
            })
        }
    }

    async fn owned_reply(&self, id: Uuid, actor: Actor) -> Result<ReviewReply> {
        let reply = self
            .replies
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Reply", id))?;
        if !actor.may_modify(reply.user_id) {
            return Err(AppError::Forbidden(
                "You can only modify your own replies".to_string(),
            ));
        }
        Ok(reply)
    }

    async fn hydrate(&self, replies: Vec<ReviewReply>) -> Result<Vec<ReplyView>> {
        let ids: Vec<Uuid> = replies.iter().map(|r| r.id).collect();
        let user_ids: Vec<Uuid> = replies.iter().map(|r| r.user_id).collect();
        let counts = self.reply_counts_for_replies(&ids).await?;
        let users = self.users.find_users(&user_ids).await?;

        Ok(replies
            .into_iter()
            .map(|reply| ReplyView {
                user: users.get(&reply.user_id).cloned(),
                reply_count: counts.get(&reply.id).copied().unwrap_or(0),
                reply,
            })
            .collect())
    }
}

fn describe_attachment(attachment: ReplyAttachment) -> String {
    match attachment {
        ReplyAttachment::Review(id) => format!("review {}", id),
        ReplyAttachment::EpisodeReview(id) => format!("episode review {}", id),
    }
}
