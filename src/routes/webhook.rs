// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Strava events.

use crate::error::Result;
use crate::services::webhook::WebhookEvent;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", get(verify).post(handle_event))
}

/// Strava webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    mode: String,
    #[serde(rename = "hub.challenge", default)]
    challenge: String,
    #[serde(rename = "hub.verify_token", default)]
    verify_token: String,
}

/// Verification response.
#[derive(Serialize)]
struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>> {
    let challenge =
        state
            .webhook
            .verify_subscription(&params.mode, &params.verify_token, &params.challenge)?;
    Ok(Json(VerifyResponse { challenge }))
}

#[derive(Serialize)]
struct EventResponse {
    success: bool,
}

/// Handle incoming webhook events (POST).
///
/// Always acknowledges, so Strava does not retry deliveries.
async fn handle_event(State(state): State<Arc<AppState>>, body: Bytes) -> Json<EventResponse> {
    match serde_json::from_slice::<WebhookEvent>(&body) {
        Ok(event) => {
            let outcome = state.webhook.handle_event(&event).await;
            tracing::debug!(?outcome, object_id = event.object_id, "Webhook event handled");
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                payload = %String::from_utf8_lossy(&body),
                "Failed to parse webhook event"
            );
        }
    }

    Json(EventResponse { success: true })
}
