//! Rate limiter for WebSocket message handling.
//!
//! Each socket gets its own limiter; a socket that exceeds it is closed.

use std::collections::VecDeque;
use tokio::time::{Duration, Instant};

use crate::config::ConnectionConfig;

/// Rate limiter using a sliding window algorithm
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent messages
    timestamps: VecDeque<Instant>,
    /// Maximum number of messages allowed in the window
    max_requests: usize,
    /// Time window for rate limiting
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    ///
    /// ```
    /// use hp_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // Allow 10 messages per second
    /// let limiter = RateLimiter::new(10, Duration::from_secs(1));
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    pub fn for_connection(config: &ConnectionConfig) -> Self {
        Self::new(config.rate_limit_max_messages, config.rate_limit_window())
    }

    /// Check if a message should be allowed
    ///
    /// Returns `true` if the message is allowed, `false` if rate limit exceeded.
    /// Rejected messages do not count against the window.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();

        // Remove timestamps outside the window
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }

    /// Get the number of remaining messages allowed in the current window
    pub fn remaining(&self) -> usize {
        self.max_requests.saturating_sub(self.timestamps.len())
    }
}
