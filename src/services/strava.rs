// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Thin wrapper over the REST endpoints. It performs no throttling and no
//! retries; it only classifies responses into [`AppError`] variants
//! (401 → `StravaUnauthorized`, 429 → `StravaRateLimited`) so the callers in
//! `fetcher` can decide what to do.

use crate::config::Config;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Default stream types requested for an activity.
pub const DEFAULT_STREAM_KEYS: &[&str] = &[
    "time",
    "distance",
    "altitude",
    "velocity_smooth",
    "heartrate",
    "cadence",
    "watts",
    "temp",
    "latlng",
];

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(
        base_url: impl Into<String>,
        oauth_url: impl Into<String>,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            oauth_url: oauth_url.into().trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.strava_api_url.clone(),
            config.strava_oauth_url.clone(),
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
        )
    }

    /// List one page of the authenticated athlete's activities, newest first.
    ///
    /// Records that cannot be read are logged and left out of the page.
    pub async fn list_activities(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ActivityPage, AppError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        log_rate_limit_usage(&response);

        let payloads: Vec<serde_json::Value> = self.check_response_json(response).await?;
        let received = payloads.len();
        let activities: Vec<StravaActivity> = payloads
            .into_iter()
            .filter_map(|value| {
                let id = value.get("id").cloned();
                match StravaActivity::from_value(value) {
                    Ok(activity) => Some(activity),
                    Err(e) => {
                        tracing::warn!(id = ?id, error = %e, "Skipping unreadable activity");
                        None
                    }
                }
            })
            .collect();

        if activities.len() < received {
            tracing::warn!(
                page,
                skipped = received - activities.len(),
                "Page contained unreadable activities"
            );
        }
        Ok(ActivityPage {
            activities,
            received,
        })
    }

    /// Get a detailed activity by ID.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<StravaActivity, AppError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        let value: serde_json::Value = self.get_json(&url, access_token).await?;
        StravaActivity::from_value(value)
            .map_err(|e| AppError::StravaApi(format!("Unexpected activity payload: {}", e)))
    }

    /// Get time-series streams for an activity, keyed by stream type.
    ///
    /// Activities without streams (404) yield an empty object.
    pub async fn get_activity_streams(
        &self,
        access_token: &str,
        activity_id: u64,
        keys: &[&str],
    ) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/activities/{}/streams", self.base_url, activity_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("keys", keys.join(",")), ("key_by_type", "true".to_string())])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }

        self.check_response_json(response).await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(response.headers());
                tracing::warn!(retry_after = ?retry_after, "Strava rate limit hit (429)");
                return Err(AppError::StravaRateLimited { retry_after });
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(AppError::StravaUnauthorized);
            }

            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Read a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Warn when the 15-minute usage reported by Strava passes 80% of its limit.
///
/// Headers look like `X-RateLimit-Limit: 100,1000` (15-minute, daily).
fn log_rate_limit_usage(response: &reqwest::Response) {
    let read = |name: &str| -> Option<(u32, u32)> {
        let raw = response.headers().get(name)?.to_str().ok()?;
        let mut parts = raw.split(',').map(|p| p.trim().parse::<u32>().ok());
        Some((parts.next()??, parts.next().flatten().unwrap_or(0)))
    };

    if let (Some((limit_15, limit_daily)), Some((usage_15, usage_daily))) =
        (read("x-ratelimit-limit"), read("x-ratelimit-usage"))
    {
        if usage_15 * 5 > limit_15 * 4 {
            tracing::warn!(
                usage_15min = usage_15,
                limit_15min = limit_15,
                usage_daily,
                limit_daily,
                "Approaching Strava rate limit"
            );
        }
    }
}

/// Token response from Strava OAuth.
///
/// The athlete is only present for authorization-code exchanges.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    #[serde(default)]
    pub athlete: Option<StravaAthlete>,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

/// One page of the activity list.
#[derive(Debug, Clone, Default)]
pub struct ActivityPage {
    pub activities: Vec<StravaActivity>,
    /// Records Strava returned, including any that could not be read.
    pub received: usize,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Strava activity with the fields we use extracted and the full payload kept.
///
/// Only `id` and `start_date` are required; other known fields fall back to
/// their defaults when missing or `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub activity_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub distance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub moving_time: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub elapsed_time: u64,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    pub start_date: DateTime<Utc>,
    /// Local wall-clock time, encoded by Strava with a misleading `Z` suffix.
    #[serde(default)]
    pub start_date_local: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timezone: String,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_state: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,
    /// The complete payload as received.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl StravaActivity {
    /// Extract known fields from a payload, keeping the payload itself.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut activity: StravaActivity = serde_json::from_value(value.clone())?;
        activity.raw = value;
        Ok(activity)
    }
}
