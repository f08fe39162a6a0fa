//! Per-caller request limiting.
//!
//! The service consults a [`RateLimiter`] before routing. The in-memory
//! implementation keeps one fixed window per identity; a shared store can
//! be swapped in behind the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::RateLimitConfig;

/// Admission decision per caller identity.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one request for `identity` and report whether it is allowed.
    async fn allow(&self, identity: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

/// Fixed-window limiter held in process memory.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    /// Create a limiter allowing `max_requests` per `window_secs` per identity.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::seconds(config.window_secs as i64),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admission check against an explicit clock.
    pub async fn allow_at(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let mut windows = self.windows.lock().await;

        // Drop expired windows so idle identities do not accumulate.
        let window = self.window;
        windows.retain(|_, w| now - w.started < window);

        let entry = windows.entry(identity.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if entry.count >= self.max_requests {
            debug!(identity = %identity, count = entry.count, "Rate limit reached");
            return false;
        }

        entry.count += 1;
        true
    }

    /// Number of identities with an open window.
    pub async fn tracked_identities(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn allow(&self, identity: &str) -> bool {
        self.allow_at(identity, Utc::now()).await
    }
}
