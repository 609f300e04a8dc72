/// Report handlers - user reports and admin moderation
use super::response::{created, ok, paginated};
use crate::error::Result;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::pagination::normalize_search;
use crate::models::report::CreateReport;
use crate::models::{PageRequest, ReportFilter, ReportStatus, ReportType, Sort};
use crate::services::Services;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub status: Option<ReportStatus>,
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,
    pub search: Option<String>,
    /// e.g. `status:asc,createdAt:desc`
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn create_report(
    svc: web::Data<Services>,
    user: AuthUser,
    req: web::Json<CreateReport>,
) -> Result<HttpResponse> {
    let report = svc
        .moderation
        .create_report(user.id, req.into_inner())
        .await?;
    Ok(created(report, "Report submitted"))
}

pub async fn list_reports(
    svc: web::Data<Services>,
    _admin: AdminUser,
    query: web::Query<ListReportsQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let filter = ReportFilter {
        status: query.status,
        report_type: query.report_type,
        search: normalize_search(query.search),
        sort: Sort::parse(query.sort.as_deref(), ReportFilter::SORTABLE)?,
    };
    let page = svc
        .moderation
        .find_all_reports(filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(paginated(page, "Reports retrieved"))
}

pub async fn get_report(
    svc: web::Data<Services>,
    _admin: AdminUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let report = svc.moderation.get_report(*id).await?;
    Ok(ok(report, "Report retrieved"))
}

pub async fn delete_report(
    svc: web::Data<Services>,
    admin: AdminUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    svc.moderation.delete_report(*id, admin.id()).await?;
    Ok(ok(serde_json::Value::Null, "Report deleted"))
}

pub async fn approve_report(
    svc: web::Data<Services>,
    admin: AdminUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let report = svc.moderation.approve_item(*id, admin.id()).await?;
    Ok(ok(report, "Report approved"))
}

pub async fn reject_report(
    svc: web::Data<Services>,
    admin: AdminUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let report = svc.moderation.reject_item(*id, admin.id()).await?;
    Ok(ok(report, "Report rejected"))
}

pub async fn ban_item(
    svc: web::Data<Services>,
    admin: AdminUser,
    path: web::Path<(String, Uuid)>,
) -> Result<HttpResponse> {
    let (item_type, id) = path.into_inner();
    let outcome = svc.moderation.ban_item(&item_type, id, admin.id()).await?;
    Ok(ok(outcome, "Item banned"))
}

pub async fn unban_item(
    svc: web::Data<Services>,
    admin: AdminUser,
    path: web::Path<(String, Uuid)>,
) -> Result<HttpResponse> {
    let (item_type, id) = path.into_inner();
    let outcome = svc.moderation.unban_item(&item_type, id, admin.id()).await?;
    Ok(ok(outcome, "Item unbanned"))
}
