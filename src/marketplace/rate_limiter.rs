//! Process-wide pacing for marketplace requests.
//!
//! Enforces a minimum spacing between requests, a cap per rolling minute and
//! the cool-down the upstream announces through `429` responses. One instance is
//! shared by every job kind through an `Arc`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::config::RateLimitConfig;

const WINDOW: Duration = Duration::from_secs(60);

/// Gate every outbound request passes through.
#[async_trait]
pub trait RequestGate: Send + Sync {
    /// Wait until the next request may be sent.
    async fn acquire(&self);

    /// Report the status (and `Retry-After` header, if any) of the request
    /// that was just sent.
    async fn observe(&self, status: u16, retry_after: Option<&str>);
}

/// Point-in-time view of limiter counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimiterStats {
    pub total_requests: u64,
    pub rate_limit_hits: u64,
    pub last_request: Option<DateTime<Utc>>,
    pub requests_this_minute: u32,
    pub max_per_minute: u32,
    pub rate_limited: bool,
    pub last_429: Option<DateTime<Utc>>,
    pub rate_limit_until: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct LimiterState {
    window_start: Instant,
    requests_this_window: u32,
    last_request: Option<Instant>,
    suspended_until: Option<Instant>,
    total_requests: u64,
    rate_limit_hits: u64,
    last_request_at: Option<DateTime<Utc>>,
    last_429_at: Option<DateTime<Utc>>,
    suspended_until_at: Option<DateTime<Utc>>,
}

/// Shared request pacer.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    max_per_minute: u32,
    default_retry_after: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            min_interval: config.min_interval(),
            max_per_minute: config.max_per_minute.max(1),
            default_retry_after: config.default_retry_after(),
            state: Mutex::new(LimiterState {
                window_start: Instant::now(),
                requests_this_window: 0,
                last_request: None,
                suspended_until: None,
                total_requests: 0,
                rate_limit_hits: 0,
                last_request_at: None,
                last_429_at: None,
                suspended_until_at: None,
            }),
        }
    }

    pub async fn stats(&self) -> RateLimiterStats {
        let state = self.state.lock().await;
        let rate_limited = state
            .suspended_until
            .is_some_and(|until| Instant::now() < until);
        RateLimiterStats {
            total_requests: state.total_requests,
            rate_limit_hits: state.rate_limit_hits,
            last_request: state.last_request_at,
            requests_this_minute: state.requests_this_window,
            max_per_minute: self.max_per_minute,
            rate_limited,
            last_429: state.last_429_at,
            rate_limit_until: state.suspended_until_at,
        }
    }

    /// Earliest instant a request may go out, or `None` when it may go now.
    fn next_slot(&self, state: &mut LimiterState, now: Instant) -> Option<Instant> {
        if let Some(until) = state.suspended_until {
            if now < until {
                return Some(until);
            }
            state.suspended_until = None;
            state.suspended_until_at = None;
        }

        if now.duration_since(state.window_start) >= WINDOW {
            state.window_start = now;
            state.requests_this_window = 0;
        }

        if state.requests_this_window >= self.max_per_minute {
            return Some(state.window_start + WINDOW);
        }

        state
            .last_request
            .map(|last| last + self.min_interval)
            .filter(|ready| now < *ready)
    }

    fn parse_retry_after(&self, header: Option<&str>) -> Duration {
        header
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after)
    }
}

#[async_trait]
impl RequestGate for RateLimiter {
    async fn acquire(&self) {
        loop {
            let resume_at = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                match self.next_slot(&mut state, now) {
                    None => {
                        state.last_request = Some(now);
                        state.requests_this_window += 1;
                        state.total_requests += 1;
                        state.last_request_at = Some(Utc::now());
                        return;
                    }
                    Some(resume_at) => {
                        if state.requests_this_window >= self.max_per_minute {
                            info!(
                                cap = self.max_per_minute,
                                wait_ms = resume_at.duration_since(now).as_millis() as u64,
                                "Per-minute request cap reached; waiting for window to roll"
                            );
                        } else {
                            debug!(
                                wait_ms = resume_at.duration_since(now).as_millis() as u64,
                                "Pacing marketplace request"
                            );
                        }
                        resume_at
                    }
                }
            };
            sleep_until(resume_at).await;
        }
    }

    async fn observe(&self, status: u16, retry_after: Option<&str>) {
        match status {
            429 => {
                let cool_down = self.parse_retry_after(retry_after);
                let mut state = self.state.lock().await;
                state.rate_limit_hits += 1;
                state.suspended_until = Some(Instant::now() + cool_down);
                let now_utc = Utc::now();
                state.last_429_at = Some(now_utc);
                state.suspended_until_at = chrono::Duration::from_std(cool_down)
                    .ok()
                    .map(|d| now_utc + d);
                counter!("marketplace_rate_limited_total").increment(1);
                warn!(
                    retry_after_secs = cool_down.as_secs(),
                    hits = state.rate_limit_hits,
                    "Marketplace returned 429; suspending outbound requests"
                );
            }
            200 => {
                let mut state = self.state.lock().await;
                if state.suspended_until.take().is_some() {
                    debug!("Marketplace accepted request; clearing rate limit suspension");
                }
                state.suspended_until_at = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(min_interval_ms: u64, max_per_minute: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            min_interval_ms,
            max_per_minute,
            default_retry_after_seconds: 30,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_acquires_are_spaced() {
        let limiter = limiter(2000, 50);
        let started = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert_eq!(limiter.stats().await.total_requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_header_suspends_acquire() {
        let limiter = limiter(0, 50);
        limiter.acquire().await;
        limiter.observe(429, Some("5")).await;

        let stats = limiter.stats().await;
        assert!(stats.rate_limited);
        assert_eq!(stats.rate_limit_hits, 1);
        assert!(stats.last_429.is_some());

        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_or_invalid_retry_after_falls_back() {
        let limiter = limiter(0, 50);
        for header in [None, Some("soon"), Some("0")] {
            limiter.observe(429, header).await;
            let started = Instant::now();
            limiter.acquire().await;
            assert!(started.elapsed() >= Duration::from_secs(30), "{header:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_suspension() {
        let limiter = limiter(0, 50);
        limiter.observe(429, Some("120")).await;
        limiter.observe(200, None).await;

        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!limiter.stats().await.rate_limited);
    }

    #[tokio::test(start_paused = true)]
    async fn per_minute_cap_waits_for_window() {
        let limiter = limiter(0, 3);
        let started = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.stats().await.requests_this_minute, 3);

        limiter.acquire().await;
        assert!(started.elapsed() >= WINDOW);
        assert_eq!(limiter.stats().await.requests_this_minute, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn other_statuses_leave_state_untouched() {
        let limiter = limiter(0, 50);
        limiter.observe(500, None).await;
        limiter.observe(404, Some("10")).await;
        let stats = limiter.stats().await;
        assert_eq!(stats.rate_limit_hits, 0);
        assert!(!stats.rate_limited);
    }
}
