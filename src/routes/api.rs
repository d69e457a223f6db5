// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Activity, StatisticsReport, User};
use crate::services::strava::DEFAULT_STREAM_KEYS;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/strava/disconnect", post(disconnect))
        .route("/api/activities", get(get_activities))
        .route("/api/activities/sync", post(sync_activities))
        .route("/api/activities/{id}", get(get_activity_detail))
        .route("/api/statistics", get(get_statistics))
}

async fn load_user(state: &AppState, email: &str) -> Result<User> {
    state
        .db
        .get_user(email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", email)))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
pub struct UserResponse {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub strava_connected: bool,
    pub strava_athlete_id: Option<u64>,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = load_user(&state, &user.email).await?;

    Ok(Json(UserResponse {
        email: profile.email,
        name: profile.name,
        image: profile.image,
        strava_connected: profile.strava_connected,
        strava_athlete_id: profile.strava_athlete_id,
    }))
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
}

/// Unlink Strava and forget the stored tokens.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DisconnectResponse>> {
    state.tokens.disconnect(&user.email).await?;
    Ok(Json(DisconnectResponse { success: true }))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<Activity>,
}

/// All stored activities, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ActivitiesResponse>> {
    let profile = load_user(&state, &user.email).await?;
    let activities = state.db.get_activities_for_user(&profile.email).await?;
    Ok(Json(ActivitiesResponse { activities }))
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub success: bool,
    /// Newly inserted activities
    pub synced: usize,
    pub updated: usize,
    pub total: usize,
}

/// Re-fetch the full history from Strava and upsert it.
async fn sync_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SyncResponse>> {
    let profile = load_user(&state, &user.email).await?;
    let result = state.sync.sync(&profile).await?;

    Ok(Json(SyncResponse {
        success: true,
        synced: result.inserted,
        updated: result.updated,
        total: result.total_fetched,
    }))
}

#[derive(Serialize)]
pub struct ActivityDetailResponse {
    /// Detailed activity exactly as Strava returned it
    pub activity: serde_json::Value,
    /// Streams keyed by type
    pub streams: serde_json::Value,
}

/// Detailed activity and its streams, fetched live from Strava.
async fn get_activity_detail(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ActivityDetailResponse>> {
    let activity_id: u64 = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid activity ID".to_string()))?;

    let profile = load_user(&state, &user.email).await?;

    let (activity, streams) = tokio::try_join!(
        state.fetcher.fetch_activity(&profile, activity_id),
        state
            .fetcher
            .fetch_activity_streams(&profile, activity_id, DEFAULT_STREAM_KEYS),
    )?;

    Ok(Json(ActivityDetailResponse {
        activity: activity.raw,
        streams,
    }))
}

// ─── Statistics ──────────────────────────────────────────────

#[derive(Deserialize)]
struct StatisticsQuery {
    year: Option<i32>,
}

/// Statistics for one calendar year (default: the current year).
async fn get_statistics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<StatisticsReport>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let profile = load_user(&state, &user.email).await?;

    let activities: Vec<Activity> = state
        .db
        .get_activities_for_user(&profile.email)
        .await?
        .into_iter()
        .filter(|a| a.local_start().year() == year)
        .collect();

    tracing::debug!(email = %profile.email, year, count = activities.len(), "Computing statistics");

    Ok(Json(StatisticsReport::build(year, &activities)))
}
