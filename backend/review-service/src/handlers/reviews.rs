/// Review handlers - title reviews
use super::response::{created, ok, paginated};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::pagination::normalize_search;
use crate::models::review::{CreateReview, ReviewPatch};
use crate::models::{PageRequest, ReviewFilter, Sort};
use crate::services::Services;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub content_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn create_review(
    svc: web::Data<Services>,
    user: AuthUser,
    req: web::Json<CreateReview>,
) -> Result<HttpResponse> {
    let review = svc.reviews.create_review(user.id, req.into_inner()).await?;
    Ok(created(review, "Review created"))
}

pub async fn list_reviews(
    svc: web::Data<Services>,
    query: web::Query<ListReviewsQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let filter = ReviewFilter {
        content_id: query.content_id,
        user_id: query.user_id,
        search: normalize_search(query.search),
        sort: Sort::parse(query.sort.as_deref(), ReviewFilter::SORTABLE)?,
    };
    let page = svc
        .reviews
        .find_reviews(filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(paginated(page, "Reviews retrieved"))
}

pub async fn get_review(svc: web::Data<Services>, id: web::Path<Uuid>) -> Result<HttpResponse> {
    let review = svc.reviews.get_review(*id).await?;
    Ok(ok(review, "Review retrieved"))
}

pub async fn update_review(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
    req: web::Json<ReviewPatch>,
) -> Result<HttpResponse> {
    let review = svc
        .reviews
        .update_review(*id, req.into_inner(), user.actor())
        .await?;
    Ok(ok(review, "Review updated"))
}

pub async fn delete_review(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
) -> Result<HttpResponse> {
    svc.reviews.delete_review(*id, user.actor()).await?;
    Ok(ok(serde_json::Value::Null, "Review deleted"))
}

pub async fn review_owner(
    svc: web::Data<Services>,
    id: web::Path<Uuid>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let is_owner = svc.reviews.is_review_owner(*id, user.id).await?;
    Ok(ok(serde_json::json!({ "isOwner": is_owner }), "Ownership checked"))
}
