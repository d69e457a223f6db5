// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity model for storage and API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::strava::StravaActivity;

/// Stored activity record, keyed by its Strava ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    /// Strava activity ID (also used as document ID, unique across all users)
    pub strava_id: u64,
    /// Owner's email
    pub user_email: String,
    /// Activity name/title
    pub name: String,
    /// Activity type (Run, Ride, Walk, Hike, Swim, Workout, ...)
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: u64,
    /// Elapsed time in seconds
    pub elapsed_time: u64,
    /// Elevation gain in meters
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    /// Start date/time (UTC)
    pub start_date: DateTime<Utc>,
    /// Wall-clock start time in the activity's own timezone
    #[serde(default)]
    pub start_date_local: Option<NaiveDateTime>,
    /// Strava timezone label, e.g. "(GMT-08:00) America/Los_Angeles"
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub location: ActivityLocation,
    /// Full Strava payload, kept for later reprocessing
    pub raw_data: serde_json::Value,
    /// When this record was last written
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivityLocation {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl Activity {
    /// Normalize a Strava payload into a stored record owned by `user_email`.
    pub fn from_strava(user_email: &str, source: &StravaActivity, now: DateTime<Utc>) -> Self {
        Self {
            strava_id: source.id,
            user_email: user_email.to_string(),
            name: source.name.clone(),
            activity_type: source.activity_type.clone(),
            distance: source.distance,
            moving_time: source.moving_time,
            elapsed_time: source.elapsed_time,
            total_elevation_gain: source.total_elevation_gain,
            start_date: source.start_date,
            start_date_local: source.start_date_local.map(|d| d.naive_utc()),
            timezone: source.timezone.clone(),
            location: ActivityLocation {
                city: source.location_city.clone(),
                state: source.location_state.clone(),
                country: source.location_country.clone(),
            },
            raw_data: source.raw.clone(),
            synced_at: now,
        }
    }

    /// Local wall-clock start, falling back to UTC when Strava gave none.
    pub fn local_start(&self) -> NaiveDateTime {
        self.start_date_local
            .unwrap_or_else(|| self.start_date.naive_utc())
    }

    /// Elevation gain with missing values treated as zero.
    pub fn elevation(&self) -> f64 {
        self.total_elevation_gain.unwrap_or(0.0)
    }
}

/// Compact activity view used inside statistics responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivitySummary {
    pub strava_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub distance: f64,
    pub moving_time: u64,
    pub total_elevation_gain: Option<f64>,
    pub start_date: DateTime<Utc>,
}

impl From<&Activity> for ActivitySummary {
    fn from(a: &Activity) -> Self {
        Self {
            strava_id: a.strava_id,
            name: a.name.clone(),
            activity_type: a.activity_type.clone(),
            distance: a.distance,
            moving_time: a.moving_time,
            total_elevation_gain: a.total_elevation_gain,
            start_date: a.start_date,
        }
    }
}
