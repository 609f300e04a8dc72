/// Episode review handlers
use super::response::{created, ok, paginated};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::pagination::normalize_search;
use crate::models::review::{CreateEpisodeReview, ReviewPatch};
use crate::models::{EpisodeReviewFilter, ModerationStatus, PageRequest, Sort};
use crate::services::Services;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEpisodeReviewsQuery {
    pub episode_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<ModerationStatus>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn create_episode_review(
    svc: web::Data<Services>,
    user: AuthUser,
    req: web::Json<CreateEpisodeReview>,
) -> Result<HttpResponse> {
    let review = svc
        .episode_reviews
        .create_episode_review(user.id, req.into_inner())
        .await?;
    Ok(created(review, "Episode review created"))
}

pub async fn list_episode_reviews(
    svc: web::Data<Services>,
    query: web::Query<ListEpisodeReviewsQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let filter = EpisodeReviewFilter {
        episode_id: query.episode_id,
        user_id: query.user_id,
        status: query.status,
        search: normalize_search(query.search),
        sort: Sort::parse(query.sort.as_deref(), EpisodeReviewFilter::SORTABLE)?,
    };
    let page = svc
        .episode_reviews
        .find_episode_reviews(filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(paginated(page, "Episode reviews retrieved"))
}

pub async fn get_episode_review(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let review = svc.episode_reviews.get_episode_review(*id).await?;
    Ok(ok(review, "Episode review retrieved"))
}

pub async fn update_episode_review(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
    req: web::Json<ReviewPatch>,
) -> Result<HttpResponse> {
    let review = svc
        .episode_reviews
        .update_episode_review(*id, req.into_inner(), user.actor())
        .await?;
    Ok(ok(review, "Episode review updated"))
}

pub async fn delete_episode_review(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
) -> Result<HttpResponse> {
    svc.episode_reviews
        .delete_episode_review(*id, user.actor())
        .await?;
    Ok(ok(serde_json::Value::Null, "Episode review deleted"))
}

pub async fn episode_review_owner(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let is_owner = svc
        .episode_reviews
        .is_episode_review_owner(*id, user.id)
        .await?;
    Ok(ok(serde_json::json!({ "isOwner": is_owner }), "Ownership checked"))
}
