//! Integration tests for the vellum-of HTTP API
//!
//! Each test drives the real router over tower's oneshot against an
//! in-memory store and the scripted provider.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::json;
use tower::util::ServiceExt;

use vellum_common::model::{OrderStatus, Tier};
use vellum_of::{build_router, AppState};

use helpers::{degraded_state, seed_order, test_state, wait_for_status, MockProvider};

/// Test helper: router plus the state backing it, for store-level checks
async fn create_test_app(provider: Arc<MockProvider>) -> (Router, AppState) {
    let state = test_state(provider).await;
    let app = build_router(state.clone());
    (app, state)
}

/// Test helper: decode a JSON response body
async fn body_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Test helper: POST a JSON body
fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_the_store_mode() {
    let (app, _state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "vellum-of");
    assert_eq!(json["store_mode"], "sqlite");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn health_shows_degraded_without_a_database() {
    let state = degraded_state(Arc::new(MockProvider::new()));
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["store_mode"], "degraded");
}

#[tokio::test]
async fn sale_webhook_creates_a_pending_order() {
    let (app, _state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/webhooks/sale",
            &json!({
                "order_id": "wh-1",
                "email": "maria@example.com",
                "name": "Maria",
                "tier": "TIER_2",
                "niche": "Dog training",
                "payment_status": "approved"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["id"], "wh-1");
    assert_eq!(json["status"], "pending_form");
    assert_eq!(json["progress"], 0);
    assert_eq!(json["tier"], "TIER_2");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/wh-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["niche"], "Dog training");
}

#[tokio::test]
async fn webhook_fills_in_id_and_niche_when_absent() {
    let (app, state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .oneshot(post_json(
            "/webhooks/sale",
            &json!({
                "email": "leo@example.com",
                "name": "Leo",
                "tier": "TIER_1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let id = json["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert_eq!(json["niche"], "Business");

    let stored = state.store.get_by_id(id).await.unwrap();
    assert_eq!(stored.customer_email, "leo@example.com");
}

#[tokio::test]
async fn non_final_payment_is_acknowledged_without_an_order() {
    let (app, state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .oneshot(post_json(
            "/webhooks/sale",
            &json!({
                "order_id": "wh-pending",
                "email": "sam@example.com",
                "name": "Sam",
                "tier": "TIER_1",
                "payment_status": "pending"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["processed"], false);

    // Nothing was stored
    assert!(state.store.get_by_id("wh-pending").await.is_err());
    assert!(state.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn replayed_webhook_is_a_conflict() {
    let (app, _state) = create_test_app(Arc::new(MockProvider::new())).await;
    let body = json!({
        "order_id": "wh-replay",
        "email": "eva@example.com",
        "name": "Eva",
        "tier": "TIER_3"
    });

    let response = app
        .clone()
        .oneshot(post_json("/webhooks/sale", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post_json("/webhooks/sale", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn degraded_store_refuses_order_creation() {
    let state = degraded_state(Arc::new(MockProvider::new()));
    let app = build_router(state);

    let response = app
        .oneshot(post_json(
            "/webhooks/sale",
            &json!({
                "email": "nina@example.com",
                "name": "Nina",
                "tier": "TIER_1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "STORE_UNAVAILABLE");
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let (app, _state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn questions_endpoint_returns_a_tier_sized_set() {
    let (app, state) = create_test_app(Arc::new(MockProvider::new())).await;
    seed_order(&state.store, "q-1", Tier::Premium).await;

    let response = app
        .oneshot(post_json("/orders/q-1/questions", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["questions"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn generate_accepts_and_finishes_in_the_background() {
    let provider = Arc::new(MockProvider::new());
    let (app, state) = create_test_app(provider).await;
    seed_order(&state.store, "gen-1", Tier::Entry).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/orders/gen-1/generate",
            &json!({
                "answers": { "What is your goal?": "Write faster" },
                "language": "en"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    assert_eq!(json["order_id"], "gen-1");
    assert_eq!(json["status"], "generating");
    assert_eq!(json["progress"], 5);

    let finished = wait_for_status(&state.store, "gen-1", OrderStatus::Completed).await;
    assert_eq!(finished.progress, 100);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/gen-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(
        json["ebook_content"]["chapters"].as_array().unwrap().len(),
        3
    );
    assert_eq!(
        json["ebook_content"]["bonuses"].as_array().unwrap().len(),
        3
    );
}

#[tokio::test]
async fn second_generate_while_running_is_a_conflict() {
    let provider = Arc::new(MockProvider::with_chapter_delay(Duration::from_millis(
        150,
    )));
    let (app, state) = create_test_app(provider).await;
    seed_order(&state.store, "busy-1", Tier::Entry).await;

    let body = json!({ "answers": {} });
    let response = app
        .clone()
        .oneshot(post_json("/orders/busy-1/generate", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // The first run holds the order's slot until its task finishes
    let response = app
        .clone()
        .oneshot(post_json("/orders/busy-1/generate", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(post_json("/orders/busy-1/resume", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    wait_for_status(&state.store, "busy-1", OrderStatus::Completed).await;
}

#[tokio::test]
async fn generate_after_completion_is_a_conflict() {
    let (app, state) = create_test_app(Arc::new(MockProvider::new())).await;
    seed_order(&state.store, "done-1", Tier::Entry).await;

    let body = json!({ "answers": {} });
    let response = app
        .clone()
        .oneshot(post_json("/orders/done-1/generate", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_for_status(&state.store, "done-1", OrderStatus::Completed).await;

    let response = app
        .oneshot(post_json("/orders/done-1/generate", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn resume_without_a_draft_is_a_conflict() {
    let (app, state) = create_test_app(Arc::new(MockProvider::new())).await;
    seed_order(&state.store, "r-1", Tier::Entry).await;
    state
        .store
        .update_status_and_progress("r-1", OrderStatus::Generating, 40)
        .await
        .unwrap();

    let response = app
        .oneshot(post_json("/orders/r-1/resume", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("no stored draft"));
}

#[tokio::test]
async fn resume_of_an_errored_order_is_a_conflict() {
    let (app, state) = create_test_app(Arc::new(MockProvider::new())).await;
    seed_order(&state.store, "err-1", Tier::Entry).await;
    state
        .store
        .update_status_and_progress("err-1", OrderStatus::Error, 26)
        .await
        .unwrap();

    let response = app
        .oneshot(post_json("/orders/err-1/resume", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("expected generating"));
}

#[tokio::test]
async fn landing_page_generator_returns_a_document() {
    let (app, _state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .oneshot(post_json(
            "/generators/landing-page",
            &json!({
                "title": "Vellum",
                "niche": "Biohacking",
                "prices": { "tier_1": "$49", "tier_2": "$99", "tier_3": "$199" },
                "checkout_links": {
                    "tier_1": "https://pay.example.com/1",
                    "tier_2": "https://pay.example.com/2",
                    "tier_3": "https://pay.example.com/3"
                },
                "language": "en"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let html = json["html"].as_str().unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Vellum"));
}

#[tokio::test]
async fn community_strategy_returns_the_full_kit() {
    let (app, _state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .oneshot(post_json(
            "/generators/community-strategy",
            &json!({ "niche": "Biohacking" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["about_page"].as_str().unwrap().contains("Biohacking"));
    assert!(json["welcome_post"].is_string());
    assert!(json["dm_scripts"].is_array());
    assert!(json["ad_copy"].is_array());
    // The default audience is applied when the request omits one
    assert!(json["growth_plan"]
        .as_str()
        .unwrap()
        .contains("High-performance entrepreneurs"));
}

#[tokio::test]
async fn events_endpoint_speaks_server_sent_events() {
    let (app, _state) = create_test_app(Arc::new(MockProvider::new())).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}
