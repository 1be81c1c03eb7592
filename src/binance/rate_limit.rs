// =============================================================================
// Rate-Limit Tracker — monitors Binance request weight to avoid 429s
// =============================================================================
//
// Binance allows 1200 request weight per minute per IP (we hard-cap ourselves
// at 1000).  The tracker reads the `X-MBX-USED-WEIGHT-1M` response header after
// every request.  The counter belongs to the wall-clock minute it was read in;
// once that minute has passed the weight counts as zero again.
// =============================================================================

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;

/// Thread-safe weight tracker backed by atomic counters.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    /// Minute (unix seconds / 60) the weight was reported for.
    minute: AtomicI64,
}

/// Serialisable view for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

fn current_minute() -> i64 {
    chrono::Utc::now().timestamp().div_euclid(60)
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
            minute: AtomicI64::new(current_minute()),
        }
    }

    /// Update the counter from Binance response headers.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let weight = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok());
        if let Some(w) = weight {
            self.record(w, current_minute());
        }
    }

    fn record(&self, weight: u32, minute: i64) {
        self.minute.store(minute, Ordering::Relaxed);
        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    fn used_weight_at(&self, minute: i64) -> u32 {
        if self.minute.load(Ordering::Relaxed) == minute {
            self.used_weight_1m.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// Weight used in the current minute.
    pub fn used_weight(&self) -> u32 {
        self.used_weight_at(current_minute())
    }

    /// Return `true` if we can afford to spend `weight` more request weight
    /// without exceeding the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        let current = self.used_weight();
        let allowed = current.saturating_add(weight) <= WEIGHT_HARD_LIMIT;
        if !allowed {
            warn!(
                current_weight = current,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked, would exceed rate-limit"
            );
        }
        allowed
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight(),
            hard_limit: WEIGHT_HARD_LIMIT,
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn header_updates_weight() {
        let tracker = RateLimitTracker::new();
        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_static("42"));
        tracker.update_from_headers(&headers);
        assert_eq!(tracker.used_weight(), 42);
    }

    #[test]
    fn garbage_header_is_ignored() {
        let tracker = RateLimitTracker::new();
        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_static("lots"));
        tracker.update_from_headers(&headers);
        assert_eq!(tracker.used_weight(), 0);
    }

    #[test]
    fn hard_limit_blocks() {
        let tracker = RateLimitTracker::new();
        let minute = current_minute();
        tracker.record(995, minute);
        assert!(tracker.used_weight_at(minute) == 995);
        assert!(!tracker.can_send_request(10));
        assert!(tracker.can_send_request(5));
    }

    #[test]
    fn huge_weight_is_refused_not_overflowed() {
        let tracker = RateLimitTracker::new();
        tracker.record(500, current_minute());
        assert!(!tracker.can_send_request(u32::MAX));
    }

    #[test]
    fn weight_expires_with_the_minute() {
        let tracker = RateLimitTracker::new();
        tracker.record(999, 1_000);
        assert_eq!(tracker.used_weight_at(1_000), 999);
        assert_eq!(tracker.used_weight_at(1_001), 0);
    }
}
