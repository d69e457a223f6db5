// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and Strava tokens, keyed by email)
//! - Activities (synced Strava activities, keyed by Strava ID)

use crate::db::{collections, ActivityWrite, BulkWriteOutcome, Store};
use crate::error::AppError;
use crate::models::{Activity, User};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

/// Projection of an activity document down to its ID.
#[derive(Deserialize)]
struct ActivityIdOnly {
    strava_id: u64,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection; avoid picking up local credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    async fn insert_activity(
        client: &firestore::FirestoreDb,
        activity: &Activity,
    ) -> Result<(), AppError> {
        let _: Activity = client
            .fluent()
            .insert()
            .into(collections::ACTIVITIES)
            .document_id(activity.strava_id.to_string())
            .object(activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite an existing activity; fails if the document is missing.
    async fn update_activity(
        client: &firestore::FirestoreDb,
        activity: &Activity,
    ) -> Result<(), AppError> {
        let _: Activity = client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(activity.strava_id.to_string())
            .object(activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Apply the writes for one Strava ID in order, recording each result.
    async fn apply_in_order(
        client: &firestore::FirestoreDb,
        writes: Vec<&ActivityWrite>,
    ) -> BulkWriteOutcome {
        let mut outcome = BulkWriteOutcome::default();
        for write in writes {
            let result = match write {
                ActivityWrite::Insert(activity) => Self::insert_activity(client, activity).await,
                ActivityWrite::Update(activity) => Self::update_activity(client, activity).await,
            };
            match (write, result) {
                (_, Err(e)) => outcome.errors.push(e.to_string()),
                (ActivityWrite::Insert(_), Ok(())) => outcome.inserted += 1,
                (ActivityWrite::Update(_), Ok(())) => outcome.updated += 1,
            }
        }
        outcome
    }
}

/// Group writes by Strava ID, keeping first-seen group order and the
/// original order within each group.
fn group_by_activity(writes: &[ActivityWrite]) -> Vec<Vec<&ActivityWrite>> {
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut groups: Vec<Vec<&ActivityWrite>> = Vec::new();
    for write in writes {
        let id = write.activity().strava_id;
        match index.get(&id) {
            Some(&slot) => groups[slot].push(write),
            None => {
                index.insert(id, groups.len());
                groups.push(vec![write]);
            }
        }
    }
    groups
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_user_by_athlete_id(&self, athlete_id: u64) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("strava_athlete_id").eq(athlete_id)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: User = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.email)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activity(&self, strava_id: u64) -> Result<Option<Activity>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&strava_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_activities_for_user(&self, email: &str) -> Result<Vec<Activity>, AppError> {
        let email = email.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.for_all([q.field("user_email").eq(email.clone())]))
            .order_by([("start_date", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_activity_ids_for_user(&self, email: &str) -> Result<HashSet<u64>, AppError> {
        let email = email.to_string();
        let ids: Vec<ActivityIdOnly> = self
            .client
            .fluent()
            .select()
            .fields(["strava_id"])
            .from(collections::ACTIVITIES)
            .filter(move |q| q.for_all([q.field("user_email").eq(email.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ids.into_iter().map(|a| a.strava_id).collect())
    }

    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<bool, AppError> {
        if self.get_activity(activity.strava_id).await?.is_some() {
            return Ok(false);
        }

        Self::insert_activity(&self.client, activity).await?;
        Ok(true)
    }

    /// Different activities are written concurrently; writes to the same
    /// activity are applied in the order given. Failures are recorded and the
    /// rest proceed.
    async fn bulk_write_activities(
        &self,
        writes: &[ActivityWrite],
    ) -> Result<BulkWriteOutcome, AppError> {
        let client = &self.client;

        let futures: Vec<_> = group_by_activity(writes)
            .into_iter()
            .map(|group| Self::apply_in_order(client, group))
            .collect();
        let outcomes: Vec<BulkWriteOutcome> = stream::iter(futures)
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut total = BulkWriteOutcome::default();
        for outcome in outcomes {
            total.inserted += outcome.inserted;
            total.updated += outcome.updated;
            total.errors.extend(outcome.errors);
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn activity(id: u64, name: &str) -> Activity {
        Activity {
            strava_id: id,
            user_email: "runner@example.com".to_string(),
            name: name.to_string(),
            activity_type: "Run".to_string(),
            distance: 5000.0,
            moving_time: 1500,
            elapsed_time: 1600,
            total_elevation_gain: None,
            start_date: Utc::now(),
            start_date_local: None,
            timezone: String::new(),
            location: Default::default(),
            raw_data: serde_json::Value::Null,
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_activity_keeps_order_within_id() {
        let writes = vec![
            ActivityWrite::Insert(activity(1, "first")),
            ActivityWrite::Insert(activity(2, "other")),
            ActivityWrite::Update(activity(1, "second")),
            ActivityWrite::Update(activity(1, "third")),
        ];

        let groups = group_by_activity(&writes);

        assert_eq!(groups.len(), 2);
        let names: Vec<&str> = groups[0]
            .iter()
            .map(|w| w.activity().name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(matches!(groups[0][0], ActivityWrite::Insert(_)));
        assert_eq!(groups[1].len(), 1);
        assert_eq!(groups[1][0].activity().strava_id, 2);
    }
}
