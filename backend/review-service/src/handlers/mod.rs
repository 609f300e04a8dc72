/// HTTP handlers for review-service
///
/// - Reviews and episode reviews
/// - Review replies and reply counts
/// - Reports and admin moderation
/// - Favorites and watchlist
pub mod episode_reviews;
pub mod library;
pub mod replies;
pub mod reports;
pub mod response;
pub mod reviews;

use crate::models::ListKind;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

/// Register every `/api/v1` route. Callers wrap the scope in
/// [`crate::middleware::JwtAuthMiddleware`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::scope("/reviews")
                .route("", web::post().to(reviews::create_review))
                .route("", web::get().to(reviews::list_reviews))
                .route("/{id}", web::get().to(reviews::get_review))
                .route("/{id}", web::patch().to(reviews::update_review))
                .route("/{id}", web::delete().to(reviews::delete_review))
                .route("/{id}/owner", web::get().to(reviews::review_owner)),
        )
        .service(
            web::scope("/episode-reviews")
                .route("", web::post().to(episode_reviews::create_episode_review))
                .route("", web::get().to(episode_reviews::list_episode_reviews))
                .route("/{id}", web::get().to(episode_reviews::get_episode_review))
                .route("/{id}", web::patch().to(episode_reviews::update_episode_review))
                .route("/{id}", web::delete().to(episode_reviews::delete_episode_review))
                .route("/{id}/owner", web::get().to(episode_reviews::episode_review_owner)),
        )
        .service(
            web::scope("/review-replies")
                .route("", web::post().to(replies::create_reply))
                .route("", web::get().to(replies::list_replies))
                .route("/count", web::get().to(replies::count_replies))
                .route("/counts", web::get().to(replies::reply_counts))
                .route("/{id}", web::get().to(replies::get_reply))
                .route("/{id}", web::patch().to(replies::update_reply))
                .route("/{id}", web::delete().to(replies::delete_reply))
                .route("/{id}/owner", web::get().to(replies::reply_owner)),
        )
        .service(
            web::scope("/reports")
                .route("", web::post().to(reports::create_report))
                .route("", web::get().to(reports::list_reports))
                .route("/ban/{type}/{id}", web::patch().to(reports::ban_item))
                .route("/unban/{type}/{id}", web::patch().to(reports::unban_item))
                .route("/{id}", web::get().to(reports::get_report))
                .route("/{id}", web::delete().to(reports::delete_report))
                .route("/{id}/approve", web::patch().to(reports::approve_report))
                .route("/{id}/reject", web::patch().to(reports::reject_report)),
        )
        .service(library_scope("/favorites", ListKind::Favorites))
        .service(library_scope("/watchlist", ListKind::Watchlist));
}

fn library_scope(path: &str, kind: ListKind) -> actix_web::Scope {
    web::scope(path)
        .app_data(web::Data::new(kind))
        .route("", web::get().to(library::list))
        .route("/count", web::get().to(library::count_for_user))
        .route("/{content_id}", web::get().to(library::contains))
        .route("/{content_id}", web::post().to(library::add))
        .route("/{content_id}", web::delete().to(library::remove))
        .route("/{content_id}/count", web::get().to(library::count_for_content))
}

/// Liveness plus a database round-trip when running on PostgreSQL
pub async fn health(pool: Option<web::Data<PgPool>>) -> HttpResponse {
    let Some(pool) = pool else {
        return HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "review-service",
            "store": "memory",
            "version": env!("CARGO_PKG_VERSION")
        }));
    };

    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "review-service",
            "store": "postgres",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "review-service"
        })),
    }
}
