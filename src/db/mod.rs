// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Store`] is the persistence seam; [`FirestoreDb`] backs deployments and
//! [`MemoryDb`] backs local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Activity, User};
use async_trait::async_trait;
use std::collections::HashSet;

/// Collection names as constants.
pub mod collections {
    /// Users, keyed by email
    pub const USERS: &str = "users";
    /// Activities, keyed by Strava activity ID
    pub const ACTIVITIES: &str = "activities";
}

/// One operation of an activity bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityWrite {
    /// Create a new record; fails if the ID already exists.
    Insert(Activity),
    /// Overwrite an existing record wholesale; fails if the ID is missing.
    Update(Activity),
}

impl ActivityWrite {
    pub fn activity(&self) -> &Activity {
        match self {
            ActivityWrite::Insert(a) | ActivityWrite::Update(a) => a,
        }
    }
}

/// Outcome of a bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteOutcome {
    pub inserted: usize,
    pub updated: usize,
    /// One message per failed operation.
    pub errors: Vec<String>,
}

/// Persistence operations used by the services.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_athlete_id(&self, athlete_id: u64) -> Result<Option<User>, AppError>;

    /// Create or replace a user, keyed by email.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    // ─── Activities ──────────────────────────────────────────────

    async fn get_activity(&self, strava_id: u64) -> Result<Option<Activity>, AppError>;

    /// All activities owned by a user, newest first.
    async fn get_activities_for_user(&self, email: &str) -> Result<Vec<Activity>, AppError>;

    /// Strava IDs of all activities owned by a user.
    async fn get_activity_ids_for_user(&self, email: &str) -> Result<HashSet<u64>, AppError>;

    /// Insert an activity unless one with the same Strava ID exists.
    ///
    /// Returns `true` if the activity was stored.
    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<bool, AppError>;

    /// Apply a batch of writes without stopping at the first failure.
    ///
    /// Writes that share a Strava ID take effect in the order given.
    async fn bulk_write_activities(
        &self,
        writes: &[ActivityWrite],
    ) -> Result<BulkWriteOutcome, AppError>;
}
