//! Per-route token bucket rate limiting.
//!
//! Buckets are keyed by route identity, not by client: every client of a
//! route draws from the same budget.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::routing::table::{RouteRule, RoutingTable};

/// A simple token bucket rate limiter.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_rate: u32) -> Self {
        Self::new_at(capacity, refill_rate, Instant::now())
    }

    fn new_at(capacity: u32, refill_rate: u32, now: Instant) -> Self {
        Self {
            capacity: f64::from(capacity.max(1)),
            refill_rate: f64::from(refill_rate),
            tokens: f64::from(capacity.max(1)),
            last_update: now,
        }
    }

    /// Take one token, or report how long until one is available.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else if self.refill_rate > 0.0 {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate))
        } else {
            Err(Duration::from_secs(1))
        }
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

impl Decision {
    /// Whole seconds for a `Retry-After` header, never less than one.
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Decision::Allowed => 0,
            Decision::Limited { retry_after } => retry_after.as_secs_f64().ceil().max(1.0) as u64,
        }
    }
}

/// All route buckets of one routing table snapshot.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    buckets: DashMap<String, Mutex<TokenBucket>>,
}

impl RateLimiterRegistry {
    /// Create one full bucket for every rate-limited route in the table.
    pub fn from_table(table: &RoutingTable) -> Self {
        let buckets = DashMap::new();
        for (_, route) in table.routes().filter(|(_, r)| r.rate_limit > 0) {
            buckets.insert(
                route.id.clone(),
                Mutex::new(TokenBucket::new(route.burst, route.rate_limit)),
            );
        }
        Self { buckets }
    }

    /// Check and consume a token for the route. Unlimited routes are always allowed.
    pub fn check(&self, route: &RouteRule) -> Decision {
        if route.rate_limit == 0 {
            return Decision::Allowed;
        }

        let entry = self
            .buckets
            .entry(route.id.clone())
            .or_insert_with(|| Mutex::new(TokenBucket::new(route.burst, route.rate_limit)));
        let mut bucket = entry.lock().unwrap_or_else(PoisonError::into_inner);

        match bucket.try_acquire() {
            Ok(()) => Decision::Allowed,
            Err(retry_after) => Decision::Limited { retry_after },
        }
    }

    /// Number of tracked buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no route is rate limited.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
