use super::catalog::UserSummary;
use super::pagination::{contains_ci, Sort, SortField, Sortable};
use super::reply::ReviewReply;
use super::review::{EpisodeReview, ModerationStatus, Review};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Review,
    EpisodeReview,
    ReviewReply,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Review => "REVIEW",
            ReportType::EpisodeReview => "EPISODE_REVIEW",
            ReportType::ReviewReply => "REVIEW_REPLY",
        }
    }

    /// Human wording for audit lines and emails
    pub fn label(&self) -> &'static str {
        match self {
            ReportType::Review => "review",
            ReportType::EpisodeReview => "episode review",
            ReportType::ReviewReply => "reply",
        }
    }

    /// Parse the `{type}` path segment of ban/unban routes.
    ///
    /// Case-insensitive, `_` and `-` interchangeable: `EPISODE_REVIEW`,
    /// `episode-review` and `Episode_Review` are the same type.
    pub fn from_path_segment(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "review" => Ok(ReportType::Review),
            "episode-review" => Ok(ReportType::EpisodeReview),
            "review-reply" | "reply" => Ok(ReportType::ReviewReply),
            _ => Err(AppError::InvalidInput(format!(
                "Unknown moderation target type '{}'",
                raw
            ))),
        }
    }
}

/// Report lifecycle: `PENDING -> APPROVED | REJECTED`, both terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Approved)
                | (ReportStatus::Pending, ReportStatus::Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Approved => "APPROVED",
            ReportStatus::Rejected => "REJECTED",
        }
    }
}

/// Polymorphic report target, resolved by tag rather than foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportTarget {
    Review(Uuid),
    EpisodeReview(Uuid),
    Reply(Uuid),
}

impl ReportTarget {
    pub fn new(report_type: ReportType, id: Uuid) -> Self {
        match report_type {
            ReportType::Review => ReportTarget::Review(id),
            ReportType::EpisodeReview => ReportTarget::EpisodeReview(id),
            ReportType::ReviewReply => ReportTarget::Reply(id),
        }
    }

    pub fn report_type(&self) -> ReportType {
        match self {
            ReportTarget::Review(_) => ReportType::Review,
            ReportTarget::EpisodeReview(_) => ReportType::EpisodeReview,
            ReportTarget::Reply(_) => ReportType::ReviewReply,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ReportTarget::Review(id) | ReportTarget::EpisodeReview(id) | ReportTarget::Reply(id) => {
                *id
            }
        }
    }

    /// Table holding the target row; interpolated only from this match
    pub fn table(&self) -> &'static str {
        match self {
            ReportTarget::Review(_) => "reviews",
            ReportTarget::EpisodeReview(_) => "episode_reviews",
            ReportTarget::Reply(_) => "review_replies",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub target_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reporter_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn target(&self) -> ReportTarget {
        ReportTarget::new(self.report_type, self.target_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReport {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub target_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "reason must be 1-255 characters"))]
    pub reason: String,
    #[validate(length(max = 2000, message = "details must be at most 2000 characters"))]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub report_type: Option<ReportType>,
    /// Matched in memory against reason, reporter name, type and status
    pub search: Option<String>,
    pub sort: Sort,
}

impl ReportFilter {
    pub const SORTABLE: &'static [SortField] = &[
        SortField::CreatedAt,
        SortField::Status,
        SortField::Type,
        SortField::Reason,
    ];

    pub fn matches(&self, report: &Report) -> bool {
        self.status.map_or(true, |s| report.status == s)
            && self.report_type.map_or(true, |t| report.report_type == t)
    }
}

/// The reported object, attached to admin listings
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportedItem {
    Review(Review),
    EpisodeReview(EpisodeReview),
    Reply(ReviewReply),
}

impl ReportedItem {
    pub fn author_id(&self) -> Uuid {
        match self {
            ReportedItem::Review(r) => r.user_id,
            ReportedItem::EpisodeReview(r) => r.user_id,
            ReportedItem::Reply(r) => r.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub reporter: Option<UserSummary>,
    pub target: Option<ReportedItem>,
}

impl ReportView {
    pub fn matches_search(&self, needle: &str) -> bool {
        contains_ci(&self.report.reason, needle)
            || self
                .reporter
                .as_ref()
                .map_or(false, |u| contains_ci(&u.username, needle))
            || contains_ci(self.report.report_type.as_str(), needle)
            || contains_ci(self.report.status.as_str(), needle)
    }
}

impl Sortable for ReportView {
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering {
        let (a, b) = (&self.report, &other.report);
        match field {
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            SortField::Type => a.report_type.as_str().cmp(b.report_type.as_str()),
            SortField::Reason => a.reason.to_lowercase().cmp(&b.reason.to_lowercase()),
            _ => a.created_at.cmp(&b.created_at),
        }
    }

    fn sort_id(&self) -> Uuid {
        self.report.id
    }
}

/// Result of a ban or unban
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationOutcome {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub target_id: Uuid,
    pub status: ModerationStatus,
    /// PENDING reports flipped to APPROVED by a ban
    pub approved_reports: u64,
}
