mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::{token, Harness, JWT_SECRET};
use review_service::handlers;
use review_service::middleware::JwtAuthMiddleware;
use serde_json::{json, Value};

macro_rules! app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($h.services.clone()))
                .service(
                    web::scope("/api/v1")
                        .wrap(JwtAuthMiddleware::new(JWT_SECRET))
                        .configure(handlers::configure),
                ),
        )
        .await
    };
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_health() {
    let h = Harness::new().await;
    let app = app!(h);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[actix_web::test]
async fn test_create_review_requires_a_caller() {
    let h = Harness::new().await;
    let app = app!(h);
    let payload = json!({
        "contentId": h.movie,
        "contentReviewed": "Tense from start to finish",
        "rating": 5
    });

    let anonymous = test::TestRequest::post()
        .uri("/api/v1/reviews")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, anonymous).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let signed_in = test::TestRequest::post()
        .uri("/api/v1/reviews")
        .insert_header(bearer(&token(h.alice, "user")))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, signed_in).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["rating"], 5);
    assert_eq!(body["data"]["userId"], h.alice.to_string());
    assert_eq!(body["data"]["status"], "ACTIVE");
}

#[actix_web::test]
async fn test_listing_uses_the_paginated_envelope() {
    let h = Harness::new().await;
    h.review(h.alice, h.movie, 4).await;
    h.review(h.bob, h.movie, 2).await;
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/reviews?contentId={}&sort=rating:asc&page=1&limit=1",
            h.movie
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["totalItems"], 2);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["itemsPerPage"], 1);
    assert_eq!(body["data"][0]["rating"], 2);
    assert_eq!(body["data"][0]["user"]["username"], "bob");
}

#[actix_web::test]
async fn test_bad_sort_key_is_a_client_error() {
    let h = Harness::new().await;
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/api/v1/reviews?sort=password:asc")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[actix_web::test]
async fn test_report_admin_routes_need_the_admin_role() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    let app = app!(h);

    let report = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&token(h.bob, "user")))
        .set_json(json!({
            "type": "REVIEW",
            "targetId": review.id,
            "reason": "spoilers"
        }))
        .to_request();
    let resp = test::call_service(&app, report).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let as_user = test::TestRequest::get()
        .uri("/api/v1/reports")
        .insert_header(bearer(&token(h.bob, "user")))
        .to_request();
    assert_eq!(test::call_service(&app, as_user).await.status(), StatusCode::FORBIDDEN);

    let anonymous = test::TestRequest::get().uri("/api/v1/reports").to_request();
    assert_eq!(
        test::call_service(&app, anonymous).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let as_admin = test::TestRequest::get()
        .uri("/api/v1/reports?status=PENDING")
        .insert_header(bearer(&token(h.admin, "admin")))
        .to_request();
    let resp = test::call_service(&app, as_admin).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["data"][0]["reporter"]["username"], "bob");
}

#[actix_web::test]
async fn test_ban_route() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 1).await;
    let app = app!(h);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/reports/ban/review/{}", review.id))
        .insert_header(bearer(&token(h.admin, "admin")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "BANNED");
    assert_eq!(body["data"]["type"], "REVIEW");
    assert_eq!(h.mailer.sent().len(), 1);
}

#[actix_web::test]
async fn test_someone_elses_review_is_forbidden() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 3).await;
    let app = app!(h);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/reviews/{}", review.id))
        .insert_header(bearer(&token(h.bob, "user")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let owner = test::TestRequest::get()
        .uri(&format!("/api/v1/reviews/{}/owner", review.id))
        .insert_header(bearer(&token(h.alice, "user")))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, owner).await).await;
    assert_eq!(body["data"]["isOwner"], true);
}

#[actix_web::test]
async fn test_favorites_routes() {
    let h = Harness::new().await;
    let app = app!(h);
    let alice = token(h.alice, "user");

    let add = test::TestRequest::post()
        .uri(&format!("/api/v1/favorites/{}", h.movie))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, add).await.status(), StatusCode::CREATED);

    let again = test::TestRequest::post()
        .uri(&format!("/api/v1/favorites/{}", h.movie))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, again).await.status(), StatusCode::CONFLICT);

    let count = test::TestRequest::get()
        .uri(&format!("/api/v1/favorites/{}/count", h.movie))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, count).await).await;
    assert_eq!(body["data"]["count"], 1);

    let watchlist = test::TestRequest::get()
        .uri("/api/v1/watchlist")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, watchlist).await).await;
    assert_eq!(body["totalItems"], 0);
}

#[actix_web::test]
async fn test_reply_counts_route() {
    let h = Harness::new().await;
    let review = h.review(h.alice, h.movie, 3).await;
    let app = app!(h);

    let create = test::TestRequest::post()
        .uri("/api/v1/review-replies")
        .insert_header(bearer(&token(h.bob, "user")))
        .set_json(json!({ "content": "Agreed", "reviewId": review.id }))
        .to_request();
    assert_eq!(test::call_service(&app, create).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/review-replies/count?reviewId={}", review.id))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["count"], 1);
}
