use dashmap::{DashMap, DashSet, mapref::entry::Entry};
use prometheus::Gauge;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::metrics::{RATE_LIMITED, TRACKED_CLIENTS};

// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    // client was already flagged earlier
    Blocked,
    // this request pushed the client over the limit
    Exceeded,
}

// Sliding window limiter keyed by client address.
//
// Once a client goes over the limit it stays blocked for the life of the
// process; nothing ever removes it from `blocked`.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>, // client -> request times, oldest first
    blocked: DashSet<String>,
    max_requests: usize,
    window: Duration,
    tracked: Gauge, // number of clients with a window
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self::with_gauge(max_requests, window, TRACKED_CLIENTS.clone())
    }

    pub fn with_gauge(max_requests: usize, window: Duration, tracked: Gauge) -> Self {
        Self {
            windows: DashMap::new(),
            blocked: DashSet::new(),
            max_requests,
            window,
            tracked,
        }
    }

    pub fn admit(&self, client: &str) -> Result<(), Rejection> {
        self.admit_at(client, Instant::now())
    }

    // Same as `admit` with an explicit clock reading
    pub fn admit_at(&self, client: &str, now: Instant) -> Result<(), Rejection> {
        if self.blocked.contains(client) {
            return Err(Rejection::Blocked);
        }

        // the entry guard holds the shard lock until we return, so two
        // requests from one client can't both see room in the window
        let mut entry = match self.windows.entry(client.to_string()) {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => {
                self.tracked.inc();
                vacant.insert(VecDeque::new())
            }
        };

        while let Some(oldest) = entry.front() {
            if now.saturating_duration_since(*oldest) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() >= self.max_requests {
            self.blocked.insert(client.to_string());
            RATE_LIMITED.inc();
            tracing::warn!(client = %client, "Rate limit exceeded for IP: {}", client);
            return Err(Rejection::Exceeded);
        }

        entry.push_back(now);
        Ok(())
    }

    #[cfg(test)]
    pub fn is_blocked(&self, client: &str) -> bool {
        self.blocked.contains(client)
    }

    // Requests currently counted against a client
    #[cfg(test)]
    pub fn window_len(&self, client: &str) -> usize {
        self.windows.get(client).map(|w| w.len()).unwrap_or(0)
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    // Drop clients whose windows hold nothing newer than the window length.
    // Returns how many were removed.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, times| {
            times.retain(|t| now.saturating_duration_since(*t) <= self.window);
            !times.is_empty()
        });
        let after = self.windows.len();
        self.tracked.set(after as f64);
        before - after
    }
}

// Periodically drops idle client windows - runs for the life of the server
pub async fn eviction_task(limiter: std::sync::Arc<RateLimiter>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    tracing::info!("Rate limit eviction started (interval: {:?})", every);

    loop {
        interval.tick().await;
        let removed = limiter.evict_idle();
        if removed > 0 {
            tracing::debug!(removed, remaining = limiter.tracked_clients(), "evicted idle clients");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn admits_up_to_the_limit() {
        let limiter = RateLimiter::new(30, WINDOW);
        let start = Instant::now();

        for i in 0..30 {
            let now = start + Duration::from_millis(i * 100);
            assert_eq!(limiter.admit_at("10.0.0.1", now), Ok(()));
        }
        assert_eq!(limiter.window_len("10.0.0.1"), 30);
    }

    #[test]
    fn thirty_first_request_is_rejected_and_blocks() {
        let limiter = RateLimiter::new(30, WINDOW);
        let start = Instant::now();

        for _ in 0..30 {
            limiter.admit_at("10.0.0.1", start).unwrap();
        }
        assert_eq!(limiter.admit_at("10.0.0.1", start), Err(Rejection::Exceeded));
        assert!(limiter.is_blocked("10.0.0.1"));

        // later calls fail fast without touching the window
        assert_eq!(limiter.admit_at("10.0.0.1", start), Err(Rejection::Blocked));
        assert_eq!(limiter.window_len("10.0.0.1"), 30);
    }

    #[test]
    fn block_outlives_the_window() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();

        limiter.admit_at("c", start).unwrap();
        limiter.admit_at("c", start).unwrap();
        assert!(limiter.admit_at("c", start).is_err());

        let much_later = start + Duration::from_secs(3600);
        assert_eq!(limiter.admit_at("c", much_later), Err(Rejection::Blocked));
    }

    #[test]
    fn old_requests_slide_out_of_the_window() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();

        limiter.admit_at("c", start).unwrap();
        limiter.admit_at("c", start + Duration::from_secs(30)).unwrap();

        // first request is now older than 60s, leaving room for one more
        let later = start + Duration::from_secs(61);
        assert_eq!(limiter.admit_at("c", later), Ok(()));
        assert_eq!(limiter.window_len("c"), 2);
    }

    #[test]
    fn clients_are_limited_independently() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = Instant::now();

        limiter.admit_at("a", now).unwrap();
        assert!(limiter.admit_at("a", now).is_err());
        assert_eq!(limiter.admit_at("b", now), Ok(()));
        assert!(!limiter.is_blocked("b"));
    }

    #[test]
    fn evicts_only_idle_clients() {
        let limiter = RateLimiter::new(10, WINDOW);
        let start = Instant::now();

        limiter.admit_at("idle", start).unwrap();
        limiter.admit_at("busy", start + Duration::from_secs(50)).unwrap();

        let removed = limiter.evict_idle_at(start + Duration::from_secs(90));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.window_len("busy"), 1);
    }

    #[test]
    fn tracked_gauge_counts_new_clients_immediately() {
        let gauge = Gauge::new("test_tracked_clients", "clients in test").unwrap();
        let limiter = RateLimiter::with_gauge(10, WINDOW, gauge.clone());
        let start = Instant::now();

        limiter.admit_at("a", start).unwrap();
        limiter.admit_at("a", start).unwrap();
        limiter.admit_at("b", start + Duration::from_secs(30)).unwrap();
        assert_eq!(gauge.get(), 2.0);

        limiter.evict_idle_at(start + Duration::from_secs(70));
        assert_eq!(gauge.get(), 1.0);
    }

    #[test]
    fn eviction_keeps_blocked_clients_blocked() {
        let limiter = RateLimiter::new(1, WINDOW);
        let start = Instant::now();

        limiter.admit_at("c", start).unwrap();
        assert!(limiter.admit_at("c", start).is_err());

        limiter.evict_idle_at(start + Duration::from_secs(120));
        assert_eq!(limiter.tracked_clients(), 0);
        assert_eq!(limiter.admit_at("c", start + Duration::from_secs(121)), Err(Rejection::Blocked));
    }

    #[test]
    fn concurrent_requests_never_exceed_the_limit() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let limiter = Arc::new(RateLimiter::new(30, WINDOW));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        if limiter.admit("shared").is_ok() {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(admitted.load(Ordering::Relaxed), 30);
    }
}
