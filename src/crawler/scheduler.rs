//! Rate limiting between page fetches
//!
//! After every processed page the coordinator hands the page's rate-limit
//! snapshot to the [`RateLimiter`], which decides how long to wait:
//! - quota nearly spent: until the reported reset time plus a buffer
//! - otherwise: a fixed polite interval

use crate::crawler::parser::RateLimitInfo;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Extra wait added on top of the reported reset time
pub const RESET_BUFFER: Duration = Duration::from_secs(5);

/// At or below this many remaining points the limiter waits for the reset
pub const LOW_QUOTA_THRESHOLD: i64 = 1;

/// Paces the crawl according to GitHub's rate-limit snapshot
#[derive(Debug, Clone)]
pub struct RateLimiter {
    polite_delay: Duration,
    reset_buffer: Duration,
}

impl RateLimiter {
    /// Creates a limiter that waits `polite_delay` between pages
    pub fn new(polite_delay: Duration) -> Self {
        Self {
            polite_delay,
            reset_buffer: RESET_BUFFER,
        }
    }

    pub fn polite_delay(&self) -> Duration {
        self.polite_delay
    }

    /// Computes how long to wait after a page with snapshot `info`
    ///
    /// If the quota is at or below [`LOW_QUOTA_THRESHOLD`] and `reset_at`
    /// parses, the result is `reset_at - now + buffer`, floored at zero.
    /// An unparseable or missing `reset_at` falls back to the polite delay.
    pub fn delay_for(&self, info: &RateLimitInfo, now: DateTime<Utc>) -> Duration {
        if info.remaining > LOW_QUOTA_THRESHOLD {
            return self.polite_delay;
        }

        match info.reset_at.as_deref().and_then(parse_reset_at) {
            Some(reset_at) => {
                let wait_ms =
                    (reset_at - now).num_milliseconds() + self.reset_buffer.as_millis() as i64;
                if wait_ms > 0 {
                    Duration::from_millis(wait_ms as u64)
                } else {
                    Duration::ZERO
                }
            }
            None => {
                tracing::warn!(
                    "Rate limit low (remaining={}) but resetAt {:?} is unusable, using polite delay",
                    info.remaining,
                    info.reset_at
                );
                self.polite_delay
            }
        }
    }

    /// Suspends the caller according to [`RateLimiter::delay_for`]
    pub async fn throttle(&self, info: &RateLimitInfo) {
        let delay = self.delay_for(info, Utc::now());
        if delay.is_zero() {
            return;
        }

        if info.remaining <= LOW_QUOTA_THRESHOLD {
            tracing::info!(
                "Rate limit low (remaining={}). Sleeping {}s until reset.",
                info.remaining,
                delay.as_secs()
            );
        } else {
            tracing::trace!("Polite sleep of {:?}", delay);
        }

        tokio::time::sleep(delay).await;
    }
}

/// Parses a `resetAt` timestamp as UTC
pub fn parse_reset_at(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
