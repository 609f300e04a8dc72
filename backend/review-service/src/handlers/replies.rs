/// Reply handlers - threaded replies and their counts
use super::response::{created, ok, paginated};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::pagination::normalize_search;
use crate::models::reply::{CreateReply, ReplyPatch};
use crate::models::{ModerationStatus, PageRequest, ParentFilter, ReplyFilter, Sort};
use crate::services::Services;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRepliesQuery {
    pub review_id: Option<Uuid>,
    pub episode_review_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// A reply id, or `null` for top-level replies
    pub parent_reply_id: Option<String>,
    pub status: Option<ModerationStatus>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountQuery {
    pub review_id: Option<Uuid>,
    pub episode_review_id: Option<Uuid>,
    pub parent_reply_id: Option<Uuid>,
}

/// Comma-separated id lists; exactly one must be given
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsQuery {
    pub review_ids: Option<String>,
    pub episode_review_ids: Option<String>,
    pub reply_ids: Option<String>,
}

pub async fn create_reply(
    svc: web::Data<Services>,
    user: AuthUser,
    req: web::Json<CreateReply>,
) -> Result<HttpResponse> {
    let reply = svc.replies.create_reply(user.id, req.into_inner()).await?;
    Ok(created(reply, "Reply created"))
}

pub async fn list_replies(
    svc: web::Data<Services>,
    query: web::Query<ListRepliesQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let filter = ReplyFilter {
        review_id: query.review_id,
        episode_review_id: query.episode_review_id,
        user_id: query.user_id,
        parent: ParentFilter::parse(query.parent_reply_id.as_deref())?,
        status: query.status,
        search: normalize_search(query.search),
        sort: Sort::parse(query.sort.as_deref(), ReplyFilter::SORTABLE)?,
    };
    let page = svc
        .replies
        .find_replies(filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(paginated(page, "Replies retrieved"))
}

pub async fn count_replies(
    svc: web::Data<Services>,
    query: web::Query<CountQuery>,
) -> Result<HttpResponse> {
    let count = match (query.review_id, query.episode_review_id, query.parent_reply_id) {
        (Some(id), None, None) => svc.replies.count_replies_for_review(id).await?,
        (None, Some(id), None) => svc.replies.count_replies_for_episode_review(id).await?,
        (None, None, Some(id)) => svc.replies.count_replies_for_reply(id).await?,
        _ => {
            return Err(AppError::InvalidInput(
                "Provide exactly one of reviewId, episodeReviewId or parentReplyId".to_string(),
            ))
        }
    };
    Ok(ok(serde_json::json!({ "count": count }), "Reply count retrieved"))
}

pub async fn reply_counts(
    svc: web::Data<Services>,
    query: web::Query<CountsQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let counts = match (query.review_ids, query.episode_review_ids, query.reply_ids) {
        (Some(ids), None, None) => svc.replies.reply_counts_for_reviews(&parse_ids(&ids)?).await?,
        (None, Some(ids), None) => {
            svc.replies
                .reply_counts_for_episode_reviews(&parse_ids(&ids)?)
                .await?
        }
        (None, None, Some(ids)) => svc.replies.reply_counts_for_replies(&parse_ids(&ids)?).await?,
        _ => {
            return Err(AppError::InvalidInput(
                "Provide exactly one of reviewIds, episodeReviewIds or replyIds".to_string(),
            ))
        }
    };
    Ok(ok(counts, "Reply counts retrieved"))
}

pub async fn get_reply(svc: web::Data<Services>, id: web::Path<Uuid>) -> Result<HttpResponse> {
    let reply = svc.replies.get_reply(*id).await?;
    Ok(ok(reply, "Reply retrieved"))
}

pub async fn update_reply(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
    req: web::Json<ReplyPatch>,
) -> Result<HttpResponse> {
    let reply = svc
        .replies
        .update_reply(*id, req.into_inner(), user.actor())
        .await?;
    Ok(ok(reply, "Reply updated"))
}

pub async fn delete_reply(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
) -> Result<HttpResponse> {
    svc.replies.delete_reply(*id, user.actor()).await?;
    Ok(ok(serde_json::Value::Null, "Reply deleted"))
}

pub async fn reply_owner(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let is_owner = svc.replies.is_reply_owner(*id, user.id).await?;
    Ok(ok(serde_json::json!({ "isOwner": is_owner }), "Ownership checked"))
}

fn parse_ids(raw: &str) -> Result<Vec<Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s).map_err(|_| AppError::InvalidInput(format!("Invalid id '{}'", s)))
        })
        .collect()
}
