// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side throttling for Strava API calls.
//!
//! Strava allows 100 requests per 15 minutes. We stay under that with a
//! sliding window of 90 requests and a minimum gap between requests. One
//! [`RateLimiter`] is shared by every Strava call made by this process.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Extra wait after the oldest request leaves the window.
const WINDOW_SAFETY_MARGIN: Duration = Duration::from_millis(100);

/// Time source used for throttling and backoff.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that never blocks: `sleep` advances time instantly and records the
/// requested duration.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualClockState>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualClockState::default()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.elapsed += duration;
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sleeps.clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + state.elapsed
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

/// Request budget for the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: usize,
    /// Sliding window length
    pub window: Duration,
    /// Gap enforced before every request
    pub min_delay: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 90,
            window: Duration::from_secs(15 * 60),
            min_delay: Duration::from_secs(1),
        }
    }
}

/// Sliding-window limiter over recent request timestamps.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    /// Held across waits so that callers queue for the shared budget.
    timestamps: tokio::sync::Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            timestamps: tokio::sync::Mutex::new(VecDeque::new()),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Wait until one more request fits in the budget, then record it.
    pub async fn acquire(&self) {
        let mut timestamps = self.timestamps.lock().await;
        let now = self.clock.now();

        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.config.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.config.max_requests {
            if let Some(&oldest) = timestamps.front() {
                let wait = self
                    .config
                    .window
                    .saturating_sub(now.duration_since(oldest))
                    + WINDOW_SAFETY_MARGIN;
                tracing::info!(
                    wait_secs = wait.as_secs_f64().ceil(),
                    in_window = timestamps.len(),
                    "Strava rate budget exhausted, waiting"
                );
                self.clock.sleep(wait).await;
            }
        }

        if !self.config.min_delay.is_zero() {
            self.clock.sleep(self.config.min_delay).await;
        }

        timestamps.push_back(self.clock.now());
    }

    /// Number of requests currently counted against the window.
    pub async fn in_window(&self) -> usize {
        let timestamps = self.timestamps.lock().await;
        let now = self.clock.now();
        timestamps
            .iter()
            .filter(|&&t| now.duration_since(t) < self.config.window)
            .count()
    }
}
