// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod fetcher;
pub mod rate_limit;
pub mod statistics;
pub mod strava;
pub mod sync;
pub mod tokens;
pub mod webhook;

pub use fetcher::ActivityFetcher;
pub use rate_limit::{Clock, ManualClock, RateLimitConfig, RateLimiter, SystemClock};
pub use strava::StravaClient;
pub use sync::{SyncResult, SyncService};
pub use tokens::TokenManager;
pub use webhook::{WebhookEvent, WebhookIngestor};
