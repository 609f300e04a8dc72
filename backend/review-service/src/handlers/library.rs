/// Favorites and watchlist handlers
///
/// Both lists are served by the same handlers; the scope they are mounted
/// under supplies the [`ListKind`] as app data.
use super::response::{created, ok, paginated};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{ListKind, PageRequest};
use crate::services::Services;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list(
    svc: web::Data<Services>,
    kind: web::Data<ListKind>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let page = svc
        .library
        .list(**kind, user.id, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(paginated(page, "List retrieved"))
}

pub async fn add(
    svc: web::Data<Services>,
    kind: web::Data<ListKind>,
    user: AuthUser,
    content_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let entry = svc.library.add(**kind, user.id, *content_id).await?;
    Ok(created(entry, "Added to list"))
}

pub async fn remove(
    svc: web::Data<Services>,
    kind: web::Data<ListKind>,
    user: AuthUser,
    content_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    svc.library.remove(**kind, user.id, *content_id).await?;
    Ok(ok(serde_json::Value::Null, "Removed from list"))
}

/// Whether the caller has the content on this list
pub async fn contains(
    svc: web::Data<Services>,
    kind: web::Data<ListKind>,
    user: AuthUser,
    content_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let present = svc.library.contains(**kind, user.id, *content_id).await?;
    Ok(ok(serde_json::json!({ "inList": present }), "Membership checked"))
}

/// How many users have the content on this list
pub async fn count_for_content(
    svc: web::Data<Services>,
    kind: web::Data<ListKind>,
    content_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let count = svc.library.count_for_content(**kind, *content_id).await?;
    Ok(ok(serde_json::json!({ "count": count }), "Count retrieved"))
}

/// Size of the caller's own list
pub async fn count_for_user(
    svc: web::Data<Services>,
    kind: web::Data<ListKind>,
    user: AuthUser,
) -> Result<HttpResponse> {
    let count = svc.library.count_for_user(**kind, user.id).await?;
    Ok(ok(serde_json::json!({ "count": count }), "Count retrieved"))
}
