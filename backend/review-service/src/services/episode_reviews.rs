/// Episode review service - one review per user per episode, no aggregate
use super::audit::AuditLogger;
use crate::db::{ContentLookup, EpisodeReviewRepository, Store, UserDirectory};
use crate::error::{AppError, Result};
use crate::models::review::{CreateEpisodeReview, EpisodeReviewView, ReviewPatch};
use crate::models::{
    Actor, AuditAction, Episode, EpisodeReview, EpisodeReviewFilter, ModerationStatus, Page,
    PageRequest,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct EpisodeReviewService {
    reviews: Arc<dyn EpisodeReviewRepository>,
    contents: Arc<dyn ContentLookup>,
    users: Arc<dyn UserDirectory>,
    audit: AuditLogger,
}

impl EpisodeReviewService {
    pub fn new(store: &Store, audit: AuditLogger) -> Self {
        Self {
            reviews: store.episode_reviews.clone(),
            contents: store.contents.clone(),
            users: store.users.clone(),
            audit,
        }
    }

    pub async fn create_episode_review(
        &self,
        user_id: Uuid,
        input: CreateEpisodeReview,
    ) -> Result<EpisodeReview> {
        let outcome = self.try_create(user_id, &input).await;
        self.audit
            .record_outcome(
                AuditAction::CreateEpisodeReview,
                user_id,
                &outcome,
                "create episode review",
            )
            .await;
        outcome.map(|(review, _)| review)
    }

    async fn try_create(
        &self,
        user_id: Uuid,
        input: &CreateEpisodeReview,
    ) -> Result<(EpisodeReview, String)> {
        input.validate()?;
        let episode = self
            .contents
            .find_episode(input.episode_id)
            .await?
            .ok_or_else(|| AppError::not_found("Episode", input.episode_id))?;

        let about = self.describe_episode(&episode).await?;

        let review = self.reviews.create(user_id, input).await?;
        tracing::info!(
            episode_review_id = %review.id,
            episode_id = %episode.id,
            user_id = %user_id,
            "Episode review created"
        );

        let message = format!("Created episode review {} for {}", review.id, about);
        Ok((review, message))
    }

    pub async fn update_episode_review(
        &self,
        id: Uuid,
        patch: ReviewPatch,
        actor: Actor,
    ) -> Result<EpisodeReview> {
        let outcome = self.try_update(id, &patch, actor).await;
        self.audit
            .record_outcome(
                AuditAction::UpdateEpisodeReview,
                actor.id(),
                &outcome,
                "update episode review",
            )
            .await;
        outcome.map(|(review, _)| review)
    }

    async fn try_update(
        &self,
        id: Uuid,
        patch: &ReviewPatch,
        actor: Actor,
    ) -> Result<(EpisodeReview, String)> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(AppError::InvalidInput("Nothing to update".to_string()));
        }
        let existing = self.owned_review(id, actor).await?;
        let about = self.describe_episode_id(existing.episode_id).await?;

        let review = self.reviews.update(id, patch).await?;
        tracing::info!(episode_review_id = %id, "Episode review updated");

        Ok((review, format!("Updated episode review {} for {}", id, about)))
    }

    pub async fn delete_episode_review(&self, id: Uuid, actor: Actor) -> Result<()> {
        let outcome = self.try_delete(id, actor).await;
        self.audit
            .record_outcome(
                AuditAction::DeleteEpisodeReview,
                actor.id(),
                &outcome,
                "delete episode review",
            )
            .await;
        outcome.map(|_| ())
    }

    async fn try_delete(&self, id: Uuid, actor: Actor) -> Result<((), String)> {
        let existing = self.owned_review(id, actor).await?;
        let about = self.describe_episode_id(existing.episode_id).await?;

        self.reviews.delete(id).await?;
        tracing::info!(episode_review_id = %id, "Episode review deleted");

        Ok(((), format!("Deleted episode review {} for {}", id, about)))
    }

    /// Only ACTIVE reviews unless the caller asks for a status
    pub async fn find_episode_reviews(
        &self,
        mut filter: EpisodeReviewFilter,
        page: PageRequest,
    ) -> Result<Page<EpisodeReviewView>> {
        filter.status.get_or_insert(ModerationStatus::Active);

        let Page {
            items,
            total,
            page,
            limit,
        } = self.reviews.list(&filter, page).await?;
        let items = self.hydrate(items).await?;
        Ok(Page {
            items,
            total,
            page,
            limit,
        })
    }

    pub async fn get_episode_review(&self, id: Uuid) -> Result<EpisodeReviewView> {
        let review = self
            .reviews
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Episode review", id))?;
        let mut views = self.hydrate(vec![review]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::not_found("Episode review", id))
    }

    pub async fn is_episode_review_owner(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let review = self
            .reviews
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Episode review", id))?;
        Ok(review.user_id == user_id)
    }

    async fn owned_review(&self, id: Uuid, actor: Actor) -> Result<EpisodeReview> {
        let review = self
            .reviews
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Episode review", id))?;
        if !actor.may_modify(review.user_id) {
            return Err(AppError::Forbidden(
                "You can only modify your own episode reviews".to_string(),
            ));
        }
        Ok(review)
    }

    /// `S01E02 "Pilot" of TV series "The Wire"`
    async fn describe_episode(&self, episode: &Episode) -> Result<String> {
        Ok(match self.contents.find_content(episode.content_id).await? {
            Some(content) => format!("{} of {}", episode.code(), content.describe()),
            None => episode.code(),
        })
    }

    async fn describe_episode_id(&self, episode_id: Uuid) -> Result<String> {
        match self.contents.find_episode(episode_id).await? {
            Some(episode) => self.describe_episode(&episode).await,
            None => Ok(format!("episode {}", episode_id)),
        }
    }

    async fn hydrate(&self, reviews: Vec<EpisodeReview>) -> Result<Vec<EpisodeReviewView>> {
        let user_ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
        let episode_ids: Vec<Uuid> = reviews.iter().map(|r| r.episode_id).collect();
        let users = self.users.find_users(&user_ids).await?;
        let episodes = self.contents.find_episodes(&episode_ids).await?;

        Ok(reviews
            .into_iter()
            .map(|review| EpisodeReviewView {
                user: users.get(&review.user_id).cloned(),
                episode: episodes.get(&review.episode_id).cloned(),
                review,
            })
            .collect())
    }
}
