// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in the `users` collection, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Email address (lowercased, also used as document ID)
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub image: Option<String>,
    /// Local credential hash, for users who did not sign in through a federated provider
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Strava OAuth access token
    #[serde(default)]
    pub strava_access_token: Option<String>,
    /// Strava OAuth refresh token
    #[serde(default)]
    pub strava_refresh_token: Option<String>,
    /// Access token expiry (unix seconds) as reported by Strava
    #[serde(default)]
    pub strava_token_expires_at: Option<i64>,
    /// Whether the user has linked their Strava account
    #[serde(default)]
    pub strava_connected: bool,
    /// Strava athlete ID, used to route webhook events
    #[serde(default)]
    pub strava_athlete_id: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh, unconnected user.
    pub fn new(email: &str, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            email: normalize_email(email),
            name,
            image: None,
            password_hash: None,
            strava_access_token: None,
            strava_refresh_token: None,
            strava_token_expires_at: None,
            strava_connected: false,
            strava_athlete_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Store a freshly issued token pair.
    pub fn set_tokens(&mut self, access_token: String, refresh_token: String, expires_at: i64) {
        self.strava_access_token = Some(access_token);
        self.strava_refresh_token = Some(refresh_token);
        self.strava_token_expires_at = Some(expires_at);
        self.updated_at = Utc::now();
    }

    /// Forget everything about the Strava link.
    pub fn clear_strava_link(&mut self) {
        self.strava_access_token = None;
        self.strava_refresh_token = None;
        self.strava_token_expires_at = None;
        self.strava_connected = false;
        self.strava_athlete_id = None;
        self.updated_at = Utc::now();
    }
}

/// Emails are stored trimmed and lowercased so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
