/// Response envelopes shared by every endpoint
use crate::models::Page;
use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total_items: i64,
    pub current_page: u32,
    pub items_per_page: u32,
    pub message: String,
}

pub fn ok<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        data,
        message: message.to_string(),
    })
}

pub fn created<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse {
        data,
        message: message.to_string(),
    })
}

pub fn paginated<T: Serialize>(page: Page<T>, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(PaginatedResponse {
        data: page.items,
        total_items: page.total,
        current_page: page.page,
        items_per_page: page.limit,
        message: message.to_string(),
    })
}
