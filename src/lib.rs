// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava Yearbook: a year-in-review dashboard for Strava athletes
//!
//! This crate provides the backend API that syncs a user's Strava activity
//! history into a local store and computes yearly statistics from it.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Store;
use services::{
    ActivityFetcher, Clock, RateLimiter, StravaClient, SyncService, TokenManager, WebhookIngestor,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub tokens: TokenManager,
    pub fetcher: ActivityFetcher,
    pub sync: SyncService,
    pub webhook: WebhookIngestor,
}

impl AppState {
    /// Wire the services around one store and one process-wide rate limiter.
    pub fn new(config: Config, db: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit, clock));
        let tokens = TokenManager::new(StravaClient::from_config(&config), db.clone());
        let fetcher = ActivityFetcher::new(tokens.clone(), limiter);
        let sync = SyncService::new(fetcher.clone(), db.clone());
        let webhook = WebhookIngestor::new(
            fetcher.clone(),
            db.clone(),
            config.webhook_verify_token.clone(),
        );

        Self {
            config,
            db,
            tokens,
            fetcher,
            sync,
            webhook,
        }
    }
}
