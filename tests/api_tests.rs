// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated API and OAuth connection flow.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use chrono::Utc;
use common::{bearer, connected_user, create_test_app, strava_activity};
use serde_json::{json, Value};
use strava_yearbook::db::Store;
use strava_yearbook::models::{Activity, User};
use strava_yearbook::services::strava::StravaActivity;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn get(router: &axum::Router, uri: &str, auth: Option<String>) -> Response {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        request = request.header(header::AUTHORIZATION, auth);
    }
    router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn store_activity(db: &impl Store, email: &str, id: u64, start: &str) {
    let mut payload = strava_activity(id);
    payload["start_date"] = json!(start);
    payload["start_date_local"] = json!(start);
    let source = StravaActivity::from_value(payload).unwrap();
    db.insert_activity_if_absent(&Activity::from_strava(email, &source, Utc::now()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_app().await;

    let response = get(&app.router, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = create_test_app().await;

    for uri in ["/api/me", "/api/activities", "/api/statistics", "/auth/strava"] {
        let response = get(&app.router, uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = get(&app.router, "/api/me", Some("Bearer garbage".to_string())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 1).await;
    let token = bearer("runner@example.com")
        .trim_start_matches("Bearer ")
        .to_string();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("session_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_reports_connection() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 31337).await;

    let response = get(&app.router, "/api/me", Some(bearer("runner@example.com"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["email"], "runner@example.com");
    assert_eq!(json["strava_connected"], true);
    assert_eq!(json["strava_athlete_id"], 31337);
}

#[tokio::test]
async fn test_me_for_unknown_user_is_404() {
    let app = create_test_app().await;

    let response = get(&app.router, "/api/me", Some(bearer("ghost@example.com"))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activities_newest_first() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 1).await;
    store_activity(&app.db, "runner@example.com", 1, "2024-01-05T08:00:00Z").await;
    store_activity(&app.db, "runner@example.com", 2, "2024-03-05T08:00:00Z").await;
    store_activity(&app.db, "other@example.com", 3, "2024-02-05T08:00:00Z").await;

    let response = get(&app.router, "/api/activities", Some(bearer("runner@example.com"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let ids: Vec<u64> = json["activities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["strava_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_statistics_for_requested_year() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 1).await;
    store_activity(&app.db, "runner@example.com", 1, "2024-01-05T08:00:00Z").await;
    store_activity(&app.db, "runner@example.com", 2, "2024-01-06T08:00:00Z").await;
    store_activity(&app.db, "runner@example.com", 3, "2023-12-31T08:00:00Z").await;

    let response = get(
        &app.router,
        "/api/statistics?year=2024",
        Some(bearer("runner@example.com")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["year"], 2024);
    assert_eq!(json["core_summary"]["total_activities"], 2);
    assert_eq!(json["core_summary"]["total_distance"], 10000.0);
    assert_eq!(json["monthly_stats"].as_array().unwrap().len(), 12);
    assert_eq!(json["monthly_stats"][0]["activities"], 2);
    assert_eq!(json["weekly_insights"]["longest_streak"], 2);
    assert_eq!(json["activity_breakdown"][0]["type"], "Run");
    assert_eq!(json["location_insights"]["top_cities"][0]["city"], "Palo Alto");
}

#[tokio::test]
async fn test_statistics_for_empty_year() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 1).await;

    let response = get(
        &app.router,
        "/api/statistics?year=2020",
        Some(bearer("runner@example.com")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["core_summary"]["total_activities"], 0);
    assert_eq!(json["monthly_stats"].as_array().unwrap().len(), 12);
    assert!(json["best_performances"]["longest_activity"].is_null());
    assert!(json["fun_facts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_activity_detail_includes_streams() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 1).await;

    Mock::given(method("GET"))
        .and(path("/activities/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(strava_activity(5)))
        .expect(1)
        .mount(&app.strava)
        .await;
    Mock::given(method("GET"))
        .and(path("/activities/5/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "heartrate": {"data": [120, 130, 140], "series_type": "distance"}
        })))
        .expect(1)
        .mount(&app.strava)
        .await;

    let response = get(&app.router, "/api/activities/5", Some(bearer("runner@example.com"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["activity"]["id"], 5);
    assert_eq!(json["activity"]["kudos_count"], 4);
    assert_eq!(json["streams"]["heartrate"]["data"][2], 140);
    assert_eq!(app.state.fetcher.limiter().in_window().await, 2);
}

#[tokio::test]
async fn test_activity_detail_rejects_bad_id() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 1).await;

    let response = get(
        &app.router,
        "/api/activities/not-a-number",
        Some(bearer("runner@example.com")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disconnect_clears_tokens() {
    let app = create_test_app().await;
    connected_user(&app.db, "runner@example.com", 1).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/strava/disconnect")
                .header(header::AUTHORIZATION, bearer("runner@example.com"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let user = app.db.get_user("runner@example.com").await.unwrap().unwrap();
    assert!(!user.strava_connected);
    assert_eq!(user.strava_access_token, None);
    assert_eq!(user.strava_athlete_id, None);
}

#[tokio::test]
async fn test_oauth_flow_connects_user() {
    let app = create_test_app().await;
    app.db
        .upsert_user(&User::new("new@example.com", None))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "refresh_token": "fresh-refresh",
            "expires_at": 2_000_000_000,
            "athlete": {"id": 555, "firstname": "Ada", "lastname": "Lovelace"}
        })))
        .expect(1)
        .mount(&app.strava)
        .await;
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.strava)
        .await;

    let start = get(&app.router, "/auth/strava", Some(bearer("new@example.com"))).await;
    assert_eq!(start.status(), StatusCode::TEMPORARY_REDIRECT);
    let authorize_url = location(&start);
    assert!(authorize_url.contains("/oauth/authorize?client_id=test_client_id"));

    let oauth_state = authorize_url
        .split("state=")
        .nth(1)
        .unwrap()
        .split('&')
        .next()
        .unwrap()
        .to_string();

    let callback = get(
        &app.router,
        &format!("/auth/strava/callback?code=abc&state={}", oauth_state),
        None,
    )
    .await;

    assert_eq!(callback.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&callback).starts_with("http://localhost:5173/callback?token="));

    let user = app.db.get_user("new@example.com").await.unwrap().unwrap();
    assert!(user.strava_connected);
    assert_eq!(user.strava_athlete_id, Some(555));
    assert_eq!(user.strava_access_token.as_deref(), Some("fresh-access"));
}

#[tokio::test]
async fn test_oauth_callback_rejects_forged_state() {
    let app = create_test_app().await;

    let callback = get(
        &app.router,
        "/auth/strava/callback?code=abc&state=Zm9yZ2VkfDF8ZGVhZGJlZWY",
        None,
    )
    .await;

    assert_eq!(callback.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&callback),
        "http://localhost:5173/callback?error=invalid_state"
    );
}
