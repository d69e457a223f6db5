// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Throttled, self-healing access to a user's Strava data.
//!
//! Every request goes through the shared [`RateLimiter`]. Pages answered with
//! 429 are retried with exponential backoff; a 401 triggers one token refresh
//! after which the same request is retried.

use crate::error::AppError;
use crate::models::User;
use crate::services::rate_limit::RateLimiter;
use crate::services::strava::{ActivityPage, StravaActivity, StravaClient};
use crate::services::tokens::TokenManager;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Page size requested from Strava (its maximum).
pub const PER_PAGE: u32 = 200;

/// 429 retries per page before giving up.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 3;

const BASE_BACKOFF: Duration = Duration::from_secs(60);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Wait before retry number `attempt` (0-based) when Strava gave no Retry-After.
pub fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF
        .checked_mul(2u32.saturating_pow(attempt))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}

/// Fetches activities on behalf of a user.
#[derive(Clone)]
pub struct ActivityFetcher {
    client: StravaClient,
    tokens: TokenManager,
    limiter: Arc<RateLimiter>,
}

impl ActivityFetcher {
    pub fn new(tokens: TokenManager, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client: tokens.client().clone(),
            tokens,
            limiter,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// The limiter every request from this fetcher goes through.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetch the user's entire activity history, in Strava's order.
    ///
    /// Stops at the first page shorter than [`PER_PAGE`]; a history that is an
    /// exact multiple of the page size therefore ends with an empty request.
    pub async fn fetch_all_activities(&self, user: &User) -> Result<Vec<StravaActivity>, AppError> {
        let mut token = self
            .tokens
            .get_access_token(user)
            .ok_or(AppError::NotConnected)?;

        let mut activities = Vec::new();
        let mut page = 1;

        loop {
            let batch = self
                .fetch_page(user, &mut token, page, activities.len())
                .await?;
            let count = batch.received;
            activities.extend(batch.activities);

            tracing::debug!(
                email = %user.email,
                page,
                count,
                total = activities.len(),
                "Fetched activity page"
            );

            if count < PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        tracing::info!(
            email = %user.email,
            total = activities.len(),
            pages = page,
            "Fetched all activities"
        );
        Ok(activities)
    }

    /// Fetch one page, retrying on 429 and refreshing the token once on 401.
    async fn fetch_page(
        &self,
        user: &User,
        token: &mut String,
        page: u32,
        fetched: usize,
    ) -> Result<ActivityPage, AppError> {
        let mut attempt = 0;
        let mut refreshed = false;

        loop {
            self.limiter.acquire().await;

            match self.client.list_activities(token, page, PER_PAGE).await {
                Ok(batch) => return Ok(batch),
                Err(AppError::StravaRateLimited { retry_after }) => {
                    if attempt >= MAX_RATE_LIMIT_RETRIES {
                        tracing::error!(
                            email = %user.email,
                            page,
                            fetched,
                            "Rate limit retries exhausted"
                        );
                        return Err(AppError::RateLimited { fetched });
                    }

                    let wait = retry_after.unwrap_or_else(|| backoff_delay(attempt));
                    attempt += 1;
                    tracing::warn!(
                        page,
                        wait_secs = wait.as_secs(),
                        attempt,
                        max_attempts = MAX_RATE_LIMIT_RETRIES,
                        "Rate limited by Strava, backing off"
                    );
                    self.limiter.clock().sleep(wait).await;
                }
                Err(AppError::StravaUnauthorized) if !refreshed => {
                    refreshed = true;
                    *token = self.refresh_or_fail(user).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch a single detailed activity.
    pub async fn fetch_activity(
        &self,
        user: &User,
        activity_id: u64,
    ) -> Result<StravaActivity, AppError> {
        let client = &self.client;
        self.with_token(user, move |token| async move {
            client.get_activity(&token, activity_id).await
        })
        .await
    }

    /// Fetch stream data for an activity, keyed by stream type.
    pub async fn fetch_activity_streams(
        &self,
        user: &User,
        activity_id: u64,
        keys: &[&str],
    ) -> Result<serde_json::Value, AppError> {
        let client = &self.client;
        self.with_token(user, move |token| async move {
            client
                .get_activity_streams(&token, activity_id, keys)
                .await
        })
        .await
    }

    /// Run a throttled request, refreshing the token and retrying once on 401.
    async fn with_token<T, F, Fut>(&self, user: &User, request: F) -> Result<T, AppError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let token = self
            .tokens
            .get_access_token(user)
            .ok_or(AppError::NotConnected)?;

        self.limiter.acquire().await;
        match request(token).await {
            Err(AppError::StravaUnauthorized) => {
                let token = self.refresh_or_fail(user).await?;
                self.limiter.acquire().await;
                request(token).await
            }
            other => other,
        }
    }

    async fn refresh_or_fail(&self, user: &User) -> Result<String, AppError> {
        tracing::info!(email = %user.email, "Strava returned 401, refreshing token");
        self.tokens
            .refresh(user)
            .await
            .ok_or(AppError::StravaUnauthorized)
    }
}
