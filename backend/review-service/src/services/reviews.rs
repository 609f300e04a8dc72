/// Review service - title reviews and the rating aggregate they feed
use super::audit::AuditLogger;
use crate::db::{ContentLookup, ReviewRepository, Store, UserDirectory};
use crate::error::{AppError, Result};
use crate::models::review::{CreateReview, ReviewPatch, ReviewView};
use crate::models::{
    Actor, AuditAction, ContentSummary, Page, PageRequest, Review, ReviewFilter,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    contents: Arc<dyn ContentLookup>,
    users: Arc<dyn UserDirectory>,
    audit: AuditLogger,
}

impl ReviewService {
    pub fn new(store: &Store, audit: AuditLogger) -> Self {
        Self {
            reviews: store.reviews.clone(),
            contents: store.contents.clone(),
            users: store.users.clone(),
            audit,
        }
    }

    /// Create a review; the content's average rating is rewritten with it.
    /// Returns the review with its author and the refreshed content.
    pub async fn create_review(&self, user_id: Uuid, input: CreateReview) -> Result<ReviewView> {
        let outcome = self.try_create(user_id, &input).await;
        self.audit
            .record_outcome(AuditAction::CreateReview, user_id, &outcome, "create review")
            .await;
        outcome.map(|(review, _)| review)
    }

    async fn try_create(&self, user_id: Uuid, input: &CreateReview) -> Result<(ReviewView, String)> {
        input.validate()?;
        let content = self
            .contents
            .find_content(input.content_id)
            .await?
            .ok_or_else(|| AppError::not_found("Content", input.content_id))?;

        let review = self.reviews.create(user_id, input).await?;
        tracing::info!(
            review_id = %review.id,
            content_id = %content.id,
            user_id = %user_id,
            rating = review.rating,
            "Review created"
        );

        let description = format!(
            "Created review {} ({}/5) for {}",
            review.id,
            review.rating,
            content.describe()
        );
        let view = self.view_after_write(review, content).await;
        Ok((view, description))
    }

    pub async fn update_review(&self, id: Uuid, patch: ReviewPatch, actor: Actor) -> Result<Review> {
        let outcome = self.try_update(id, &patch, actor).await;
        self.audit
            .record_outcome(AuditAction::UpdateReview, actor.id(), &outcome, "update review")
            .await;
        outcome.map(|(review, _)| review)
    }

    async fn try_update(
        &self,
        id: Uuid,
        patch: &ReviewPatch,
        actor: Actor,
    ) -> Result<(Review, String)> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(AppError::InvalidInput("Nothing to update".to_string()));
        }
        let existing = self.owned_review(id, actor).await?;
        let about = self.describe_content(existing.content_id).await?;

        let review = self.reviews.update(id, patch).await?;
        tracing::info!(review_id = %id, content_id = %review.content_id, "Review updated");

        Ok((review, format!("Updated review {} for {}", id, about)))
    }

    /// Delete a review together with its replies and the reports on them
    pub async fn delete_review(&self, id: Uuid, actor: Actor) -> Result<()> {
        let outcome = self.try_delete(id, actor).await;
        self.audit
            .record_outcome(AuditAction::DeleteReview, actor.id(), &outcome, "delete review")
            .await;
        outcome.map(|_| ())
    }

    async fn try_delete(&self, id: Uuid, actor: Actor) -> Result<((), String)> {
        let existing = self.owned_review(id, actor).await?;
        let about = self.describe_content(existing.content_id).await?;

        self.reviews.delete(id).await?;
        tracing::info!(review_id = %id, content_id = %existing.content_id, "Review deleted");

        Ok(((), format!("Deleted review {} for {}", id, about)))
    }

    /// Listing is not filtered by moderation status; banned reviews stay
    /// visible here.
    pub async fn find_reviews(
        &self,
        filter: ReviewFilter,
        page: PageRequest,
    ) -> Result<Page<ReviewView>> {
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

    pub async fn get_review(&self, id: Uuid) -> Result<ReviewView> {
        let review = self
            .reviews
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Review", id))?;
        let mut views = self.hydrate(vec![review]).await?;
        views.pop().ok_or_else(|| AppError::not_found("Review", id))
    }

    pub async fn is_review_owner(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let review = self
            .reviews
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Review", id))?;
        Ok(review.user_id == user_id)
    }

    async fn owned_review(&self, id: Uuid, actor: Actor) -> Result<Review> {
        let review = self
            .reviews
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Review", id))?;
        if !actor.may_modify(review.user_id) {
            return Err(AppError::Forbidden(
                "You can only modify your own reviews".to_string(),
            ));
        }
        Ok(review)
    }

    async fn describe_content(&self, content_id: Uuid) -> Result<String> {
        Ok(self
            .contents
            .find_content(content_id)
            .await?
            .map(|c| c.describe())
            .unwrap_or_else(|| format!("content {}", content_id)))
    }

    /// The row is already committed here, so a failed lookup degrades the
    /// view instead of failing the call.
    async fn view_after_write(&self, review: Review, content: ContentSummary) -> ReviewView {
        let user_ids = [review.user_id];
        let content_ids = [review.content_id];
        let (users, contents) = match futures::try_join!(
            self.users.find_users(&user_ids),
            self.contents.find_contents(&content_ids),
        ) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(review_id = %review.id, error = %e, "Failed to hydrate review");
                Default::default()
            }
        };
        ReviewView {
            user: users.get(&review.user_id).cloned(),
            content: contents.get(&review.content_id).cloned().or(Some(content)),
            review,
        }
    }

    async fn hydrate(&self, reviews: Vec<Review>) -> Result<Vec<ReviewView>> {
        let user_ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
        let content_ids: Vec<Uuid> = reviews.iter().map(|r| r.content_id).collect();
        let users = self.users.find_users(&user_ids).await?;
        let contents = self.contents.find_contents(&content_ids).await?;

        Ok(reviews
            .into_iter()
            .map(|review| ReviewView {
                user: users.get(&review.user_id).cloned(),
                content: contents.get(&review.content_id).cloned(),
                review,
            })
            .collect())
    }
}
