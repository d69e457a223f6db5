// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for webhook handling.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{connected_user, create_test_app, strava_activity};
use serde_json::json;
use strava_yearbook::db::Store;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn post_event(router: &axum::Router, body: String) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn create_event(activity_id: u64, owner_id: u64) -> String {
    json!({
        "object_type": "activity",
        "object_id": activity_id,
        "aspect_type": "create",
        "owner_id": owner_id,
        "subscription_id": 1,
        "event_time": 1_717_250_000
    })
    .to_string()
}

#[tokio::test]
async fn test_webhook_verification() {
    let app = create_test_app().await;

    let challenge = "test_challenge_123";
    let verify_token = "test_verify_token"; // Matches Config::test_default()

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/webhook?hub.mode=subscribe&hub.challenge={}&hub.verify_token={}",
                    challenge, verify_token
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    // Verify the response contains the challenge
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["hub.challenge"], challenge);
}

#[tokio::test]
async fn test_webhook_verification_wrong_token() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/webhook?hub.mode=subscribe&hub.challenge=abc&hub.verify_token=wrong_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_webhook_verification_wrong_mode() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/webhook?hub.mode=unsubscribe&hub.challenge=abc&hub.verify_token=test_verify_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_create_event_stores_once() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 4242).await;

    Mock::given(method("GET"))
        .and(path("/activities/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(strava_activity(77)))
        .mount(&app.strava)
        .await;

    let (status, body) = post_event(&app.router, create_event(77, 4242)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = post_event(&app.router, create_event(77, 4242)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.db.activity_count(), 1);
    let stored = app.db.get_activity(77).await.unwrap().unwrap();
    assert_eq!(stored.user_email, "runner@example.com");
    assert_eq!(stored.activity_type, "Run");
}

#[tokio::test]
async fn test_create_event_fetch_counts_against_shared_limiter() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 4242).await;

    Mock::given(method("GET"))
        .and(path("/activities/78"))
        .respond_with(ResponseTemplate::new(200).set_body_json(strava_activity(78)))
        .expect(1)
        .mount(&app.strava)
        .await;

    let limiter = app.state.fetcher.limiter();
    assert_eq!(limiter.in_window().await, 0);

    let (status, _) = post_event(&app.router, create_event(78, 4242)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(limiter.in_window().await, 1);

    // The ingestor and the sync path share one budget.
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.strava)
        .await;
    let user = app.db.get_user("runner@example.com").await.unwrap().unwrap();
    app.state.sync.sync(&user).await.unwrap();
    assert_eq!(limiter.in_window().await, 2);
}

#[tokio::test]
async fn test_unknown_athlete_is_acknowledged_without_fetch() {
    let app = create_test_app().await;

    Mock::given(method("GET"))
        .and(path("/activities/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(strava_activity(77)))
        .expect(0)
        .mount(&app.strava)
        .await;

    let (status, body) = post_event(&app.router, create_event(77, 999)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.db.activity_count(), 0);
}

#[tokio::test]
async fn test_provider_failure_is_acknowledged() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 4242).await;

    Mock::given(method("GET"))
        .and(path("/activities/77"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.strava)
        .await;

    let (status, body) = post_event(&app.router, create_event(77, 4242)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.db.activity_count(), 0);
}

#[tokio::test]
async fn test_non_create_events_are_ignored() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 4242).await;

    Mock::given(method("GET"))
        .and(path("/activities/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(strava_activity(77)))
        .expect(0)
        .mount(&app.strava)
        .await;

    let event = json!({
        "object_type": "activity",
        "object_id": 77,
        "aspect_type": "update",
        "owner_id": 4242,
        "updates": {"title": "Renamed"}
    })
    .to_string();
    let (status, _) = post_event(&app.router, event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.db.activity_count(), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_acknowledged() {
    let app = create_test_app().await;

    let (status, body) = post_event(&app.router, "{not json".to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
