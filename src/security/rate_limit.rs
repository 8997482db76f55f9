//! Sliding-window-log rate limiter keyed by client address.
//!
//! # Responsibilities
//! - Track exact admission instants per client in a trailing window
//! - Deny the (max+1)-th request within the window, with retry metadata
//! - Expose limit/remaining/reset metadata on every decision
//! - Bound memory via an amortized probabilistic sweep of stale records
//!
//! # Design Decisions
//! - A concurrent map with per-key entry locking makes the
//!   trim-then-append sequence atomic per client without a global lock
//! - `admit` takes the evaluation instant as a parameter so the window
//!   arithmetic is deterministic under test
//! - The sweep fires on a random draw per admitted request, never on the
//!   denial path, and never blocks other keys

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::RateLimitConfig;
use crate::http::response::Denial;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_key::{derive_client_key, ClientKey};

/// Per-client admission log.
///
/// `timestamps` holds only instants inside the trailing window at the
/// moment they are read; entries outside it are purged on each access.
struct WindowRecord {
    timestamps: VecDeque<Instant>,
    last_seen: SystemTime,
}

impl WindowRecord {
    fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
            last_seen: SystemTime::now(),
        }
    }
}

/// Outcome of a single rate-limit evaluation.
///
/// Produced on every call, allowed or denied, so the boundary can attach
/// `X-RateLimit-*` headers unconditionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitDecision {
    pub allowed: bool,
    pub limit: usize,
    pub remaining: usize,
    /// Rolling horizon: the window start plus the window duration, both
    /// taken at evaluation time.
    pub reset_at: Instant,
    /// Time until the oldest retained timestamp exits the window.
    /// Present only on denial.
    pub retry_after: Option<Duration>,
}

impl AdmitDecision {
    /// Retry-After in whole seconds, rounded up, never zero.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after
            .map(|d| (d.as_secs_f64().ceil() as u64).max(1))
    }
}

/// Usage summary for a single tracked client.
#[derive(Debug, Serialize)]
pub struct KeyUsage {
    pub key: String,
    pub count: usize,
    pub last_seen_unix: u64,
}

/// Aggregate limiter state for the admin surface.
#[derive(Debug, Serialize)]
pub struct LimiterStats {
    pub limit: usize,
    pub window_secs: u64,
    pub total_tracked: usize,
    pub active: usize,
    pub top: Vec<KeyUsage>,
}

/// Sliding-window-log admission control shared across all requests.
pub struct SlidingWindowLimiter {
    records: DashMap<String, WindowRecord>,
    window: Duration,
    max_requests: usize,
    sweep_probability: f64,
}

impl SlidingWindowLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            records: DashMap::new(),
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            sweep_probability: config.sweep_probability,
        }
    }

    /// Evaluate one request for `key` at instant `now`.
    ///
    /// Trims expired timestamps for the key, then either appends `now` and
    /// admits, or denies with the time until the oldest entry expires.
    pub fn admit(&self, key: &str, now: Instant) -> AdmitDecision {
        // checked_sub guards against instants too close to the monotonic
        // clock origin (short-uptime hosts, some test environments).
        let cutoff = now.checked_sub(self.window);
        let reset_at = cutoff.map_or(now, |window_start| window_start + self.window);

        let decision = {
            let mut record = self
                .records
                .entry(key.to_string())
                .or_insert_with(WindowRecord::new);

            if let Some(cutoff) = cutoff {
                while record.timestamps.front().is_some_and(|&t| t <= cutoff) {
                    record.timestamps.pop_front();
                }
            }

            if record.timestamps.len() >= self.max_requests {
                let retry_after = record.timestamps.front().map_or(self.window, |&oldest| {
                    (oldest + self.window).saturating_duration_since(now)
                });
                AdmitDecision {
                    allowed: false,
                    limit: self.max_requests,
                    remaining: 0,
                    reset_at,
                    retry_after: Some(retry_after),
                }
            } else {
                record.timestamps.push_back(now);
                record.last_seen = SystemTime::now();
                AdmitDecision {
                    allowed: true,
                    limit: self.max_requests,
                    remaining: self.max_requests - record.timestamps.len(),
                    reset_at,
                    retry_after: None,
                }
            }
        };

        // The entry guard is dropped above; sweeping here cannot deadlock.
        if decision.allowed && fastrand::f64() < self.sweep_probability {
            let removed = self.sweep_stale(now);
            if removed > 0 {
                tracing::debug!(removed, "rate limit sweep dropped stale records");
            }
            metrics::record_tracked_keys(self.records.len());
        }

        decision
    }

    /// Drop records whose newest timestamp has left the window.
    ///
    /// Returns how many records were removed. Also callable directly, e.g.
    /// from a background task.
    pub fn sweep_stale(&self, now: Instant) -> usize {
        let cutoff = now.checked_sub(self.window);
        let before = self.records.len();
        self.records
            .retain(|_, record| match (record.timestamps.back(), cutoff) {
                (Some(&last), Some(cutoff)) => last > cutoff,
                (Some(_), None) => true,
                (None, _) => false,
            });
        before - self.records.len()
    }

    /// Discard the record for `key`. Returns whether a record existed.
    pub fn reset(&self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    /// Aggregate statistics: total tracked keys, keys with at least one
    /// retained timestamp, and the top-N keys by retained count (count
    /// descending, key ascending on ties).
    pub fn stats(&self, top_n: usize) -> LimiterStats {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window);

        let mut entries: Vec<KeyUsage> = Vec::new();
        let mut active = 0usize;
        let total_tracked = self.records.len();

        for record in self.records.iter() {
            let count = match cutoff {
                Some(cutoff) => record.timestamps.iter().filter(|&&t| t > cutoff).count(),
                None => record.timestamps.len(),
            };
            if count > 0 {
                active += 1;
            }
            entries.push(KeyUsage {
                key: record.key().clone(),
                count,
                last_seen_unix: record
                    .last_seen
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs(),
            });
        }

        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        entries.truncate(top_n);

        LimiterStats {
            limit: self.max_requests,
            window_secs: self.window.as_secs(),
            total_tracked,
            active,
            top: entries,
        }
    }
}

fn header_num(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// Middleware enforcing the limiter. Second step of the admission chain.
///
/// Rate-limit metadata is attached to every response, admitted or denied.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = match request.extensions().get::<ClientKey>() {
        Some(ClientKey(key)) => key.clone(),
        None => derive_client_key(None, request.headers(), Some(addr)),
    };

    let now = Instant::now();
    let decision = state.limiter.admit(&key, now);
    let reset_unix = (SystemTime::now() + decision.reset_at.saturating_duration_since(now))
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %key,
            limit = decision.limit,
            "request denied by rate limiter"
        );
        metrics::record_denied("rate_limit");
        Denial::RateLimited {
            limit: decision.limit,
            retry_after_secs: decision.retry_after_secs().unwrap_or(1),
        }
        .into_response()
    };

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", header_num(decision.limit as u64));
    headers.insert(
        "x-ratelimit-remaining",
        header_num(decision.remaining as u64),
    );
    headers.insert("x-ratelimit-reset", header_num(reset_unix));
    if let Some(secs) = decision.retry_after_secs() {
        headers.insert("retry-after", header_num(secs));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn limiter(max_requests: usize, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(&RateLimitConfig {
            window_secs,
            max_requests,
            sweep_probability: 0.0,
            stats_top_n: 10,
        })
    }

    #[test]
    fn admits_up_to_limit_then_denies() {
        let limiter = limiter(3, 10);
        let now = Instant::now();

        assert_eq!(limiter.admit("k", now).remaining, 2);
        assert_eq!(limiter.admit("k", now).remaining, 1);
        assert_eq!(limiter.admit("k", now).remaining, 0);

        let denied = limiter.admit("k", now);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after, Some(Duration::from_secs(10)));
    }

    #[test]
    fn retry_after_tracks_oldest_timestamp() {
        let limiter = limiter(2, 10);
        let base = Instant::now();

        assert!(limiter.admit("k", base).allowed);
        assert!(limiter.admit("k", base + Duration::from_secs(4)).allowed);

        let denied = limiter.admit("k", base + Duration::from_secs(6));
        assert!(!denied.allowed);
        // The oldest entry (at base) exits the window at base + 10s.
        assert_eq!(denied.retry_after, Some(Duration::from_secs(4)));
        assert!(denied.retry_after_secs().unwrap() > 0);
    }

    #[test]
    fn window_slides() {
        let limiter = limiter(2, 10);
        let base = Instant::now();

        assert!(limiter.admit("k", base).allowed);
        assert!(limiter.admit("k", base + Duration::from_secs(1)).allowed);
        assert!(!limiter.admit("k", base + Duration::from_secs(2)).allowed);

        // The base entry has expired by base + 11s.
        assert!(limiter.admit("k", base + Duration::from_secs(11)).allowed);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1, 10);
        let now = Instant::now();
        assert!(limiter.admit("a", now).allowed);
        assert!(limiter.admit("b", now).allowed);
        assert!(!limiter.admit("a", now).allowed);
    }

    #[test]
    fn reset_discards_record() {
        let limiter = limiter(1, 10);
        let now = Instant::now();

        assert!(!limiter.reset("k"));
        assert!(limiter.admit("k", now).allowed);
        assert!(!limiter.admit("k", now).allowed);
        assert!(limiter.reset("k"));
        assert!(limiter.admit("k", now).allowed);
    }

    #[test]
    fn sweep_removes_stale_records() {
        let limiter = limiter(5, 10);
        let base = Instant::now();

        limiter.admit("stale", base);
        limiter.admit("fresh", base + Duration::from_secs(12));

        let removed = limiter.sweep_stale(base + Duration::from_secs(12));
        assert_eq!(removed, 1);

        let stats = limiter.stats(10);
        assert_eq!(stats.total_tracked, 1);
        assert_eq!(stats.top[0].key, "fresh");
    }

    #[test]
    fn stats_orders_by_count_then_key() {
        let limiter = limiter(10, 60);
        let now = Instant::now();

        for _ in 0..3 {
            limiter.admit("busy", now);
        }
        limiter.admit("b", now);
        limiter.admit("a", now);

        let stats = limiter.stats(10);
        assert_eq!(stats.total_tracked, 3);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.top[0].key, "busy");
        assert_eq!(stats.top[0].count, 3);
        assert_eq!(stats.top[1].key, "a");
        assert_eq!(stats.top[2].key, "b");
    }

    #[test]
    fn stats_respects_top_n() {
        let limiter = limiter(10, 60);
        let now = Instant::now();
        for key in ["a", "b", "c", "d"] {
            limiter.admit(key, now);
        }
        assert_eq!(limiter.stats(2).top.len(), 2);
    }

    #[test]
    fn concurrent_admissions_never_over_admit() {
        let limiter = Arc::new(limiter(50, 600));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let limiter = Arc::clone(&limiter);
            handles.push(thread::spawn(move || {
                let mut allowed = 0usize;
                for _ in 0..50 {
                    if limiter.admit("shared", Instant::now()).allowed {
                        allowed += 1;
                    }
                }
                allowed
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
    }
}
