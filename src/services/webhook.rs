// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava webhook subscription handshake and event ingestion.

use crate::db::Store;
use crate::error::AppError;
use crate::models::Activity;
use crate::services::fetcher::ActivityFetcher;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

/// Strava webhook event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// "activity" or "athlete"
    pub object_type: String,
    pub object_id: u64,
    /// "create", "update", "delete"
    pub aspect_type: String,
    /// Strava athlete ID of the owner
    pub owner_id: u64,
    #[serde(default)]
    pub subscription_id: Option<u64>,
    #[serde(default)]
    pub event_time: Option<i64>,
}

impl WebhookEvent {
    pub fn is_activity_create(&self) -> bool {
        self.object_type == "activity" && self.aspect_type == "create"
    }
}

/// What happened to a delivered event. Webhook callers only ever see success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Stored,
    AlreadyStored,
    Ignored,
    Failed,
}

/// Ingests newly created activities pushed by Strava.
#[derive(Clone)]
pub struct WebhookIngestor {
    fetcher: ActivityFetcher,
    db: Arc<dyn Store>,
    verify_token: String,
}

impl WebhookIngestor {
    pub fn new(fetcher: ActivityFetcher, db: Arc<dyn Store>, verify_token: String) -> Self {
        Self {
            fetcher,
            db,
            verify_token,
        }
    }

    /// Answer a subscription challenge, returning the challenge to echo.
    pub fn verify_subscription(
        &self,
        mode: &str,
        token: &str,
        challenge: &str,
    ) -> Result<String, AppError> {
        if mode == "subscribe" && token == self.verify_token {
            tracing::info!("Webhook subscription verified");
            Ok(challenge.to_string())
        } else {
            tracing::warn!(mode, "Webhook verification failed: invalid token");
            Err(AppError::Forbidden)
        }
    }

    /// Process one event. Errors are logged here and never returned.
    pub async fn handle_event(&self, event: &WebhookEvent) -> EventOutcome {
        tracing::info!(
            object_type = %event.object_type,
            object_id = event.object_id,
            aspect_type = %event.aspect_type,
            owner_id = event.owner_id,
            "Webhook event received"
        );

        if !event.is_activity_create() {
            return EventOutcome::Ignored;
        }

        match self.ingest_activity(event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    activity_id = event.object_id,
                    owner_id = event.owner_id,
                    error = %e,
                    "Failed to ingest webhook activity"
                );
                EventOutcome::Failed
            }
        }
    }

    async fn ingest_activity(&self, event: &WebhookEvent) -> Result<EventOutcome, AppError> {
        let Some(user) = self.db.get_user_by_athlete_id(event.owner_id).await? else {
            tracing::debug!(owner_id = event.owner_id, "No user for webhook athlete");
            return Ok(EventOutcome::Ignored);
        };

        if self.fetcher.tokens().get_access_token(&user).is_none() {
            tracing::debug!(email = %user.email, "Webhook user has no access token");
            return Ok(EventOutcome::Ignored);
        }

        let source = self.fetcher.fetch_activity(&user, event.object_id).await?;
        let activity = Activity::from_strava(&user.email, &source, Utc::now());

        if self.db.insert_activity_if_absent(&activity).await? {
            tracing::info!(
                activity_id = activity.strava_id,
                email = %user.email,
                "Stored activity from webhook"
            );
            Ok(EventOutcome::Stored)
        } else {
            tracing::debug!(activity_id = activity.strava_id, "Activity already stored");
            Ok(EventOutcome::AlreadyStored)
        }
    }
}
