//! Sliding-window request quota, one per venue connector.
//!
//! Mirrors the sliding-window accounting already used for equity/drawdown
//! tracking elsewhere in this workspace (a bounded deque of timestamps
//! rather than a fixed-bucket counter), so a burst that straddles a bucket
//! boundary cannot exceed the advertised limit.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tracks request timestamps within a rolling window and refuses once the
/// venue's published quota would be exceeded.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: VecDeque::new(),
        }
    }

    /// Binance-style default: 1000 requests per 60s.
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    fn evict_stale(&mut self, now: Instant) {
        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `Ok(())` and records the request if the window has capacity,
    /// or `Err(retry_after)` with the duration until the oldest request in
    /// the window ages out.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        self.evict_stale(now);

        if self.timestamps.len() >= self.max_requests {
            let oldest = *self.timestamps.front().expect("len >= max_requests > 0");
            let retry_after = self.window - now.duration_since(oldest);
            return Err(retry_after);
        }

        self.timestamps.push_back(now);
        Ok(())
    }

    pub fn in_flight(&mut self) -> usize {
        self.evict_stale(Instant::now());
        self.timestamps.len()
    }
}
