//! Rate limiter for WebSocket frame handling.
//!
//! Caps how fast a single session can push frames within sliding time
//! windows.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter.
///
/// Keeps at most `max_requests` admission stamps. A new request is admitted
/// while there is a free slot, or by retiring the oldest stamp once it has
/// aged out of the window; the oldest stamp is the only one that ever needs
/// inspecting, so admission is O(1) and memory is bounded by the limit
/// itself.
#[derive(Debug)]
pub struct RateLimiter {
    stamps: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            stamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Burst protection: 10 frames per second.
    pub fn burst() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// Sustained protection: 100 frames per minute.
    pub fn sustained() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    /// Record a request if allowed. Returns false while the last
    /// `max_requests` admissions all fall inside the window.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        if self.stamps.len() >= self.max_requests {
            match self.stamps.front() {
                Some(oldest) if now.duration_since(*oldest) <= self.window => return false,
                _ => {
                    self.stamps.pop_front();
                }
            }
        }
        self.stamps.push_back(now);
        true
    }
}
