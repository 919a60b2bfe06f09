//! Per-client token buckets in front of the scrape route.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use engine_logging::engine_warn;
use tokio::sync::Mutex;

use crate::server::error_response;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Takes one token, or returns how long until one is available.
    fn try_take(&mut self, rate_per_sec: f64, capacity: f64, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate_per_sec).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / rate_per_sec))
        }
    }

    /// A bucket that has refilled completely is indistinguishable from a fresh one.
    fn is_full_at(&self, rate_per_sec: f64, capacity: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens + elapsed * rate_per_sec >= capacity
    }
}

/// Client count above which idle buckets are dropped before a new one is added.
const PRUNE_ABOVE: usize = 1024;

/// Allows `per_minute` requests per client IP per minute, with an equal burst.
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    capacity: f64,
    rate_per_sec: f64,
    prune_above: usize,
}

impl RateLimiter {
    pub fn per_minute(per_minute: u32) -> Self {
        let per_minute = f64::from(per_minute.max(1));
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: per_minute,
            rate_per_sec: per_minute / 60.0,
            prune_above: PRUNE_ABOVE,
        }
    }

    /// `Err` carries the wait before the client may retry.
    pub async fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        let mut buckets = self.buckets.lock().await;
        if buckets.len() >= self.prune_above && !buckets.contains_key(&ip) {
            buckets.retain(|_, bucket| !bucket.is_full_at(self.rate_per_sec, self.capacity, now));
        }
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(self.capacity, now))
            .try_take(self.rate_per_sec, self.capacity, now)
    }
}

pub async fn limit_by_ip(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check(addr.ip()).await {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            let retry_after = wait.as_secs_f64().ceil().max(1.0) as u64;
            engine_warn!("rate limited {} on {} (retry in {}s)", addr.ip(), request.uri().path(), retry_after);
            let mut response = error_response(StatusCode::TOO_MANY_REQUESTS, "rate limited");
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[tokio::test]
    async fn burst_is_capped_at_the_per_minute_budget() {
        let limiter = RateLimiter::per_minute(3);
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at(CLIENT, now).await.is_ok());
        }
        let wait = limiter.check_at(CLIENT, now).await.unwrap_err();
        assert!(wait > Duration::from_secs(19) && wait <= Duration::from_secs(20), "{wait:?}");
    }

    #[tokio::test]
    async fn clients_have_separate_buckets() {
        let limiter = RateLimiter::per_minute(1);
        let now = Instant::now();
        assert!(limiter.check_at(CLIENT, now).await.is_ok());
        assert!(limiter.check_at(CLIENT, now).await.is_err());
        assert!(limiter.check_at(OTHER, now).await.is_ok());
    }

    #[tokio::test]
    async fn refilled_buckets_are_dropped_once_the_map_is_crowded() {
        let limiter = RateLimiter {
            prune_above: 2,
            ..RateLimiter::per_minute(60)
        };
        let start = Instant::now();
        assert!(limiter.check_at(CLIENT, start).await.is_ok());
        assert!(limiter.check_at(OTHER, start + Duration::from_millis(1500)).await.is_ok());

        // CLIENT is full again by now; OTHER still owes half a token.
        let newcomer = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3));
        assert!(limiter.check_at(newcomer, start + Duration::from_secs(2)).await.is_ok());

        let buckets = limiter.buckets.lock().await;
        assert_eq!(buckets.len(), 2);
        assert!(!buckets.contains_key(&CLIENT));
        assert!(buckets.contains_key(&OTHER));
    }

    #[tokio::test]
    async fn many_one_off_clients_do_not_grow_the_map_without_bound() {
        let limiter = RateLimiter {
            prune_above: 16,
            ..RateLimiter::per_minute(60)
        };
        let start = Instant::now();
        for n in 0..1000u32 {
            let ip = IpAddr::V4(Ipv4Addr::from(0x0a01_0000 + n));
            // One request per client, one second apart: each bucket refills before the next newcomer.
            assert!(limiter.check_at(ip, start + Duration::from_secs(u64::from(n))).await.is_ok());
        }
        assert!(limiter.buckets.lock().await.len() <= 16);
    }

    #[tokio::test]
    async fn tokens_refill_over_time() {
        let limiter = RateLimiter::per_minute(60);
        let start = Instant::now();
        for _ in 0..60 {
            assert!(limiter.check_at(CLIENT, start).await.is_ok());
        }
        assert!(limiter.check_at(CLIENT, start).await.is_err());
        let later = start + Duration::from_millis(1500);
        assert!(limiter.check_at(CLIENT, later).await.is_ok());
    }
}
