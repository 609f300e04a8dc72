use super::catalog::{ContentSummary, Episode, UserSummary};
use super::pagination::{contains_ci, Sort, SortField, Sortable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use uuid::Uuid;
use validator::Validate;

/// Moderation flag on reviews, episode reviews and replies.
///
/// Independent of any report's own status; admins flip it freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "moderation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    Active,
    Banned,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Active => "ACTIVE",
            ModerationStatus::Banned => "BANNED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub content_reviewed: String,
    pub rating: i32,
    pub content_id: Uuid,
    pub user_id: Uuid,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeReview {
    pub id: Uuid,
    pub content_reviewed: String,
    pub rating: i32,
    pub episode_id: Uuid,
    pub user_id: Uuid,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    pub content_id: Uuid,
    #[validate(length(min = 1, max = 5000, message = "review text must be 1-5000 characters"))]
    pub content_reviewed: String,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEpisodeReview {
    pub episode_id: Uuid,
    #[validate(length(min = 1, max = 5000, message = "review text must be 1-5000 characters"))]
    pub content_reviewed: String,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i32,
}

/// Partial update shared by reviews and episode reviews
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    #[validate(length(min = 1, max = 5000, message = "review text must be 1-5000 characters"))]
    pub content_reviewed: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: Option<i32>,
}

impl ReviewPatch {
    pub fn is_empty(&self) -> bool {
        self.content_reviewed.is_none() && self.rating.is_none()
    }
}

/// Review listing filter. Deliberately carries no status: banned reviews
/// stay listed.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub content_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort: Sort,
}

impl ReviewFilter {
    pub const SORTABLE: &'static [SortField] = &[
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::Rating,
        SortField::Status,
    ];

    pub fn matches(&self, review: &Review) -> bool {
        self.content_id.map_or(true, |id| review.content_id == id)
            && self.user_id.map_or(true, |id| review.user_id == id)
            && self
                .search
                .as_deref()
                .map_or(true, |s| contains_ci(&review.content_reviewed, s))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EpisodeReviewFilter {
    pub episode_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<ModerationStatus>,
    pub search: Option<String>,
    pub sort: Sort,
}

impl EpisodeReviewFilter {
    pub const SORTABLE: &'static [SortField] = ReviewFilter::SORTABLE;

    pub fn matches(&self, review: &EpisodeReview) -> bool {
        self.episode_id.map_or(true, |id| review.episode_id == id)
            && self.user_id.map_or(true, |id| review.user_id == id)
            && self.status.map_or(true, |s| review.status == s)
            && self
                .search
                .as_deref()
                .map_or(true, |s| contains_ci(&review.content_reviewed, s))
    }
}

impl Sortable for Review {
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering {
        match field {
            SortField::UpdatedAt => self.updated_at.cmp(&other.updated_at),
            SortField::Rating => self.rating.cmp(&other.rating),
            SortField::Status => self.status.cmp(&other.status),
            _ => self.created_at.cmp(&other.created_at),
        }
    }

    fn sort_id(&self) -> Uuid {
        self.id
    }
}

impl Sortable for EpisodeReview {
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering {
        match field {
            SortField::UpdatedAt => self.updated_at.cmp(&other.updated_at),
            SortField::Rating => self.rating.cmp(&other.rating),
            SortField::Status => self.status.cmp(&other.status),
            _ => self.created_at.cmp(&other.created_at),
        }
    }

    fn sort_id(&self) -> Uuid {
        self.id
    }
}

/// Review hydrated with its author and content
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub user: Option<UserSummary>,
    pub content: Option<ContentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeReviewView {
    #[serde(flatten)]
    pub review: EpisodeReview,
    pub user: Option<UserSummary>,
    pub episode: Option<Episode>,
}

/// Arithmetic mean of the ratings, 0 when there are none
pub fn mean_rating(ratings: impl IntoIterator<Item = i32>) -> f64 {
    let (sum, count) = ratings
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), r| (sum + r as i64, count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
