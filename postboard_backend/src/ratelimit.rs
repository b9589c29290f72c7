//! Fixed-window request limiter keyed by client address.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Independent budgets; a login attempt does not consume the general budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    General,
    Login,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    window: Duration,
    general_max: u32,
    login_max: u32,
    windows: Arc<Mutex<HashMap<(Bucket, IpAddr), Window>>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            general_max: config.max_requests,
            login_max: config.login_max_requests,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records one hit and reports whether it is within budget.
    pub fn check(&self, bucket: Bucket, ip: IpAddr) -> bool {
        self.check_at(bucket, ip, Instant::now())
    }

    fn check_at(&self, bucket: Bucket, ip: IpAddr, now: Instant) -> bool {
        let max = match bucket {
            Bucket::General => self.general_max,
            Bucket::Login => self.login_max,
        };
        let Ok(mut windows) = self.windows.lock() else {
            tracing::error!("rate limiter mutex poisoned; letting request through");
            return true;
        };

        // Drop stale windows so the map does not grow with every address seen.
        if windows.len() > 4096 {
            let window = self.window;
            windows.retain(|_, entry| now.duration_since(entry.started) < window);
        }

        let entry = windows.entry((bucket, ip)).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                hits: 0,
            };
        }
        entry.hits = entry.hits.saturating_add(1);

        let allowed = entry.hits <= max;
        if !allowed {
            tracing::info!(%ip, ?bucket, hits = entry.hits, "rate limit exceeded");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            window_secs: 60,
            max_requests: 3,
            login_max_requests: 2,
        })
    }

    #[test]
    fn budget_resets_when_the_window_rolls_over() {
        let limiter = limiter();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let start = Instant::now();

        assert!(limiter.check_at(Bucket::Login, ip, start));
        assert!(limiter.check_at(Bucket::Login, ip, start));
        assert!(!limiter.check_at(Bucket::Login, ip, start));

        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at(Bucket::Login, ip, later));
    }

    #[test]
    fn buckets_and_addresses_are_counted_separately() {
        let limiter = limiter();
        let first: IpAddr = "10.0.0.1".parse().unwrap();
        let second: IpAddr = "10.0.0.2".parse().unwrap();
        let now = Instant::now();

        for _ in 0..2 {
            assert!(limiter.check_at(Bucket::Login, first, now));
        }
        assert!(!limiter.check_at(Bucket::Login, first, now));
        assert!(limiter.check_at(Bucket::General, first, now));
        assert!(limiter.check_at(Bucket::Login, second, now));
    }
}
