// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.

use crate::db::{ActivityWrite, BulkWriteOutcome, Store};
use crate::error::AppError;
use crate::models::{Activity, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Store backed by concurrent hash maps. Cloning shares the data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    activities: Arc<DashMap<u64, Activity>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored activities across all users.
    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(email).map(|u| u.clone()))
    }

    async fn get_user_by_athlete_id(&self, athlete_id: u64) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.strava_athlete_id == Some(athlete_id))
            .map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn get_activity(&self, strava_id: u64) -> Result<Option<Activity>, AppError> {
        Ok(self.activities.get(&strava_id).map(|a| a.clone()))
    }

    async fn get_activities_for_user(&self, email: &str) -> Result<Vec<Activity>, AppError> {
        let mut activities: Vec<Activity> = self
            .activities
            .iter()
            .filter(|a| a.user_email == email)
            .map(|a| a.clone())
            .collect();
        activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(activities)
    }

    async fn get_activity_ids_for_user(&self, email: &str) -> Result<HashSet<u64>, AppError> {
        Ok(self
            .activities
            .iter()
            .filter(|a| a.user_email == email)
            .map(|a| a.strava_id)
            .collect())
    }

    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<bool, AppError> {
        match self.activities.entry(activity.strava_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(activity.clone());
                Ok(true)
            }
        }
    }

    async fn bulk_write_activities(
        &self,
        writes: &[ActivityWrite],
    ) -> Result<BulkWriteOutcome, AppError> {
        let mut outcome = BulkWriteOutcome::default();

        // Applied in order, so the last write for a given ID wins.
        for write in writes {
            match write {
                ActivityWrite::Insert(activity) => match self.activities.entry(activity.strava_id)
                {
                    Entry::Occupied(_) => outcome.errors.push(format!(
                        "duplicate key: activity {} already exists",
                        activity.strava_id
                    )),
                    Entry::Vacant(slot) => {
                        slot.insert(activity.clone());
                        outcome.inserted += 1;
                    }
                },
                ActivityWrite::Update(activity) => {
                    match self.activities.get_mut(&activity.strava_id) {
                        Some(mut existing) => {
                            *existing = activity.clone();
                            outcome.updated += 1;
                        }
                        None => outcome.errors.push(format!(
                            "not found: activity {} does not exist",
                            activity.strava_id
                        )),
                    }
                }
            }
        }

        Ok(outcome)
    }
}
