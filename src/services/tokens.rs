// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava credential management.
//!
//! Access tokens are used as stored; expiry is discovered reactively when
//! Strava answers 401, at which point the fetcher asks for a [`refresh`].
//!
//! [`refresh`]: TokenManager::refresh

use crate::db::Store;
use crate::error::AppError;
use crate::models::user::normalize_email;
use crate::models::User;
use crate::services::strava::StravaClient;
use std::sync::Arc;

/// Reads, refreshes, and persists a user's Strava tokens.
#[derive(Clone)]
pub struct TokenManager {
    client: StravaClient,
    db: Arc<dyn Store>,
}

impl TokenManager {
    pub fn new(client: StravaClient, db: Arc<dyn Store>) -> Self {
        Self { client, db }
    }

    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    /// The stored access token, if any.
    pub fn get_access_token(&self, user: &User) -> Option<String> {
        user.strava_access_token.clone()
    }

    /// Exchange the stored refresh token for a new token pair and persist it.
    ///
    /// Returns `None` if the user has no refresh token or the exchange fails.
    pub async fn refresh(&self, user: &User) -> Option<String> {
        let mut current = match self.db.get_user(&user.email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                tracing::warn!(email = %user.email, "Token refresh for unknown user");
                return None;
            }
            Err(e) => {
                tracing::error!(email = %user.email, error = %e, "Failed to load user for refresh");
                return None;
            }
        };

        let refresh_token = current.strava_refresh_token.clone()?;

        let tokens = match self.client.refresh_token(&refresh_token).await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(email = %user.email, error = %e, "Strava token refresh failed");
                return None;
            }
        };

        current.set_tokens(
            tokens.access_token.clone(),
            tokens.refresh_token,
            tokens.expires_at,
        );

        if let Err(e) = self.db.upsert_user(&current).await {
            tracing::error!(email = %user.email, error = %e, "Failed to persist refreshed tokens");
            return None;
        }

        tracing::info!(email = %user.email, expires_at = tokens.expires_at, "Strava token refreshed");
        Some(tokens.access_token)
    }

    /// Link a Strava account using an OAuth authorization code.
    ///
    /// Creates the user if this is their first visit.
    pub async fn connect(&self, email: &str, code: &str) -> Result<User, AppError> {
        let tokens = self.client.exchange_code(code).await?;
        let athlete = tokens.athlete.as_ref().ok_or_else(|| {
            AppError::StravaApi("Token response did not include athlete".to_string())
        })?;

        let email = normalize_email(email);
        let mut user = match self.db.get_user(&email).await? {
            Some(u) => u,
            None => {
                let name = match (&athlete.firstname, &athlete.lastname) {
                    (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
                    (Some(first), None) => Some(first.clone()),
                    _ => None,
                };
                User::new(&email, name)
            }
        };

        if user.image.is_none() {
            user.image = athlete.profile.clone();
        }
        user.strava_athlete_id = Some(athlete.id);
        user.strava_connected = true;
        user.set_tokens(
            tokens.access_token.clone(),
            tokens.refresh_token.clone(),
            tokens.expires_at,
        );

        self.db.upsert_user(&user).await?;

        tracing::info!(email = %user.email, athlete_id = athlete.id, "Strava account connected");
        Ok(user)
    }

    /// Remove the Strava link and all stored credentials.
    pub async fn disconnect(&self, email: &str) -> Result<User, AppError> {
        let mut user = self
            .db
            .get_user(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", email)))?;

        user.clear_strava_link();
        self.db.upsert_user(&user).await?;

        tracing::info!(email = %user.email, "Strava account disconnected");
        Ok(user)
    }
}
