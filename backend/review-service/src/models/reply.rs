use super::catalog::UserSummary;
use super::pagination::{contains_ci, Sort, SortField, Sortable};
use super::review::ModerationStatus;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReply {
    pub id: Uuid,
    pub content: String,
    pub status: ModerationStatus,
    pub user_id: Uuid,
    pub review_id: Option<Uuid>,
    pub episode_review_id: Option<Uuid>,
    pub parent_reply_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewReply {
    /// The review or episode review this reply hangs off
    pub fn attachment(&self) -> Option<ReplyAttachment> {
        match (self.review_id, self.episode_review_id) {
            (Some(id), None) => Some(ReplyAttachment::Review(id)),
            (None, Some(id)) => Some(ReplyAttachment::EpisodeReview(id)),
            _ => None,
        }
    }
}

/// Exactly one of review / episode review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyAttachment {
    Review(Uuid),
    EpisodeReview(Uuid),
}

impl ReplyAttachment {
    pub fn from_ids(review_id: Option<Uuid>, episode_review_id: Option<Uuid>) -> Result<Self> {
        match (review_id, episode_review_id) {
            (Some(id), None) => Ok(ReplyAttachment::Review(id)),
            (None, Some(id)) => Ok(ReplyAttachment::EpisodeReview(id)),
            (Some(_), Some(_)) => Err(AppError::InvalidInput(
                "A reply cannot target both a review and an episode review".to_string(),
            )),
            (None, None) => Err(AppError::InvalidInput(
                "A reply must target either a review or an episode review".to_string(),
            )),
        }
    }

    pub fn review_id(&self) -> Option<Uuid> {
        match self {
            ReplyAttachment::Review(id) => Some(*id),
            ReplyAttachment::EpisodeReview(_) => None,
        }
    }

    pub fn episode_review_id(&self) -> Option<Uuid> {
        match self {
            ReplyAttachment::EpisodeReview(id) => Some(*id),
            ReplyAttachment::Review(_) => None,
        }
    }
}

/// What a reply count is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyParent {
    Review,
    EpisodeReview,
    Reply,
}

impl ReplyParent {
    pub fn column(&self) -> &'static str {
        match self {
            ReplyParent::Review => "review_id",
            ReplyParent::EpisodeReview => "episode_review_id",
            ReplyParent::Reply => "parent_reply_id",
        }
    }

    pub fn key_of(&self, reply: &ReviewReply) -> Option<Uuid> {
        match self {
            ReplyParent::Review => reply.review_id,
            ReplyParent::EpisodeReview => reply.episode_review_id,
            ReplyParent::Reply => reply.parent_reply_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReply {
    #[validate(length(min = 1, max = 500, message = "reply must be 1-500 characters"))]
    pub content: String,
    pub review_id: Option<Uuid>,
    pub episode_review_id: Option<Uuid>,
    pub parent_reply_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReplyPatch {
    #[validate(length(min = 1, max = 500, message = "reply must be 1-500 characters"))]
    pub content: String,
}

/// Position-in-tree filter for reply listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFilter {
    #[default]
    Any,
    /// Top-level replies only
    Root,
    /// Direct children of the given reply
    Children(Uuid),
}

impl ParentFilter {
    /// `None` → any, `"null"` → roots, an id → that reply's children
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(ParentFilter::Any),
            Some(v) if v.eq_ignore_ascii_case("null") => Ok(ParentFilter::Root),
            Some(v) => Uuid::parse_str(v)
                .map(ParentFilter::Children)
                .map_err(|_| AppError::InvalidInput(format!("Invalid parentReplyId '{}'", v))),
        }
    }

    pub fn matches(&self, parent: Option<Uuid>) -> bool {
        match self {
            ParentFilter::Any => true,
            ParentFilter::Root => parent.is_none(),
            ParentFilter::Children(id) => parent == Some(*id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplyFilter {
    pub review_id: Option<Uuid>,
    pub episode_review_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub parent: ParentFilter,
    pub status: Option<ModerationStatus>,
    pub search: Option<String>,
    pub sort: Sort,
}

impl ReplyFilter {
    pub const SORTABLE: &'static [SortField] = &[
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::Status,
    ];

    pub fn matches(&self, reply: &ReviewReply) -> bool {
        self.review_id.map_or(true, |id| reply.review_id == Some(id))
            && self
                .episode_review_id
                .map_or(true, |id| reply.episode_review_id == Some(id))
            && self.user_id.map_or(true, |id| reply.user_id == id)
            && self.parent.matches(reply.parent_reply_id)
            && self.status.map_or(true, |s| reply.status == s)
            && self
                .search
                .as_deref()
                .map_or(true, |s| contains_ci(&reply.content, s))
    }
}

impl Sortable for ReviewReply {
    fn compare_field(&self, other: &Self, field: SortField) -> Ordering {
        match field {
            SortField::UpdatedAt => self.updated_at.cmp(&other.updated_at),
            SortField::Status => self.status.cmp(&other.status),
            _ => self.created_at.cmp(&other.created_at),
        }
    }

    fn sort_id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    #[serde(flatten)]
    pub reply: ReviewReply,
    pub user: Option<UserSummary>,
    /// Direct ACTIVE children
    pub reply_count: i64,
}

/// Reply ids reachable from a root, grouped by depth.
///
/// Built one level at a time by re-querying `parent_reply_id`, so the walk
/// is iterative and never holds a tree in memory between requests. Ids seen
/// twice are dropped so a cyclic parent chain terminates.
#[derive(Debug, Clone)]
pub struct ReplySubtree {
    levels: Vec<Vec<Uuid>>,
    seen: HashSet<Uuid>,
}

impl ReplySubtree {
    pub fn new(root: Uuid) -> Self {
        Self {
            levels: vec![vec![root]],
            seen: HashSet::from([root]),
        }
    }

    /// Deepest level collected so far
    pub fn frontier(&self) -> &[Uuid] {
        self.levels.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append the children of the current frontier. Returns false once the
    /// walk has reached the leaves.
    pub fn push_level(&mut self, children: impl IntoIterator<Item = Uuid>) -> bool {
        let level: Vec<Uuid> = children
            .into_iter()
            .filter(|id| self.seen.insert(*id))
            .collect();
        if level.is_empty() {
            return false;
        }
        self.levels.push(level);
        true
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.levels.iter().flatten().copied().collect()
    }

    /// Replies beneath the root
    pub fn descendants(&self) -> usize {
        self.seen.len() - 1
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Levels leaves-first; deleting in this order never removes a row that
    /// still has children.
    pub fn deletion_order(&self) -> impl Iterator<Item = &[Uuid]> {
        self.levels.iter().rev().map(Vec::as_slice)
    }
}
