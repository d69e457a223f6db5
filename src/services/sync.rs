// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Full activity resync: fetch everything from Strava and reconcile it with
//! the local store.

use crate::db::{ActivityWrite, Store};
use crate::error::AppError;
use crate::models::{Activity, User};
use crate::services::fetcher::ActivityFetcher;
use crate::services::strava::StravaActivity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Largest number of operations submitted in one bulk write.
pub const BULK_WRITE_BATCH_SIZE: usize = 1000;

/// Counts reported after a sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub inserted: usize,
    pub updated: usize,
    pub total_fetched: usize,
}

/// Reconciles a user's Strava history with the store.
#[derive(Clone)]
pub struct SyncService {
    fetcher: ActivityFetcher,
    db: Arc<dyn Store>,
}

impl SyncService {
    pub fn new(fetcher: ActivityFetcher, db: Arc<dyn Store>) -> Self {
        Self { fetcher, db }
    }

    /// Fetch every activity and upsert it, keyed by Strava ID.
    pub async fn sync(&self, user: &User) -> Result<SyncResult, AppError> {
        if !user.strava_connected {
            return Err(AppError::NotConnected);
        }

        let fetched = self.fetcher.fetch_all_activities(user).await?;
        if fetched.is_empty() {
            tracing::info!(email = %user.email, "No activities to sync");
            return Ok(SyncResult::default());
        }

        let existing = self.db.get_activity_ids_for_user(&user.email).await?;
        let writes = plan_writes(&user.email, &fetched, &existing, Utc::now());

        let planned_inserts = writes
            .iter()
            .filter(|w| matches!(w, ActivityWrite::Insert(_)))
            .count();

        let mut result = SyncResult {
            total_fetched: fetched.len(),
            ..SyncResult::default()
        };
        for (index, batch) in writes.chunks(BULK_WRITE_BATCH_SIZE).enumerate() {
            let outcome = self.db.bulk_write_activities(batch).await?;
            if !outcome.errors.is_empty() {
                tracing::error!(
                    email = %user.email,
                    batch = index,
                    failed = outcome.errors.len(),
                    first_error = %outcome.errors[0],
                    "Bulk write had failures"
                );
                return Err(AppError::Database(format!(
                    "{} of {} activity writes failed: {}",
                    outcome.errors.len(),
                    batch.len(),
                    outcome.errors[0]
                )));
            }
            result.inserted += outcome.inserted;
            result.updated += outcome.updated;
        }

        if result.inserted != planned_inserts {
            tracing::warn!(
                email = %user.email,
                planned_inserts,
                applied_inserts = result.inserted,
                "Applied writes differ from classification"
            );
        }

        tracing::info!(
            email = %user.email,
            inserted = result.inserted,
            updated = result.updated,
            total = result.total_fetched,
            "Sync complete"
        );
        Ok(result)
    }
}

/// Classify fetched activities as inserts or updates, preserving fetch order.
///
/// An ID seen earlier in the same fetch counts as existing, so repeats
/// become updates and the last occurrence wins.
pub fn plan_writes(
    user_email: &str,
    fetched: &[StravaActivity],
    existing: &HashSet<u64>,
    now: DateTime<Utc>,
) -> Vec<ActivityWrite> {
    let mut seen = existing.clone();
    fetched
        .iter()
        .map(|source| {
            let activity = Activity::from_strava(user_email, source, now);
            if seen.insert(source.id) {
                ActivityWrite::Insert(activity)
            } else {
                ActivityWrite::Update(activity)
            }
        })
        .collect()
}
