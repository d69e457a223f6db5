// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::{json, Value};
use std::sync::Arc;
use strava_yearbook::config::Config;
use strava_yearbook::db::{MemoryDb, Store};
use strava_yearbook::middleware::auth::create_jwt;
use strava_yearbook::models::User;
use strava_yearbook::routes::create_router;
use strava_yearbook::services::ManualClock;
use strava_yearbook::AppState;
use wiremock::MockServer;

/// App wired to an in-memory store, a manual clock, and a mock Strava.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub clock: Arc<ManualClock>,
    pub strava: MockServer,
}

/// Create a test app whose Strava API and OAuth endpoints point at a mock server.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    let strava = MockServer::start().await;

    let mut config = Config::test_default();
    config.strava_api_url = strava.uri();
    config.strava_oauth_url = format!("{}/oauth", strava.uri());

    let db = MemoryDb::new();
    let clock = Arc::new(ManualClock::new());
    let state = Arc::new(AppState::new(
        config,
        Arc::new(db.clone()),
        clock.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        clock,
        strava,
    }
}

/// Store a user with a linked Strava account.
#[allow(dead_code)]
pub async fn connected_user(db: &MemoryDb, email: &str, athlete_id: u64) -> User {
    let mut user = User::new(email, Some("Test Athlete".to_string()));
    user.set_tokens(
        "access-token".to_string(),
        "refresh-token".to_string(),
        1_900_000_000,
    );
    user.strava_connected = true;
    user.strava_athlete_id = Some(athlete_id);
    db.upsert_user(&user).await.unwrap();
    user
}

/// A Strava activity payload as returned by the list and detail endpoints.
#[allow(dead_code)]
pub fn strava_activity(id: u64) -> Value {
    json!({
        "id": id,
        "name": format!("Activity {}", id),
        "type": "Run",
        "distance": 5000.0,
        "moving_time": 1500,
        "elapsed_time": 1600,
        "total_elevation_gain": 20.0,
        "start_date": "2024-06-01T14:00:00Z",
        "start_date_local": "2024-06-01T07:00:00Z",
        "timezone": "(GMT-08:00) America/Los_Angeles",
        "location_city": "Palo Alto",
        "location_state": "California",
        "location_country": "United States",
        "kudos_count": 4
    })
}

/// A page of consecutive activity payloads starting at `first_id`.
#[allow(dead_code)]
pub fn activity_page(first_id: u64, count: usize) -> Value {
    Value::Array(
        (0..count as u64)
            .map(|i| strava_activity(first_id + i))
            .collect(),
    )
}

/// `Authorization` header value for a session as `email`.
#[allow(dead_code)]
pub fn bearer(email: &str) -> String {
    let jwt = create_jwt(email, &Config::test_default().jwt_signing_key).unwrap();
    format!("Bearer {}", jwt)
}
