//! Exchange rate caching with TTL support.

use chrono::{DateTime, Duration, Utc};
use durian_common::{constants, Clock};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::rate::ExchangeRate;

/// Cached rate entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    rate: ExchangeRate,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.cached_at) < ttl
    }
}

/// Configuration for rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// How long a cached rate is served before the network is tried again.
    pub ttl: Duration,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: constants::rate_cache_ttl(),
        }
    }
}

/// Thread-safe single-rate cache with TTL.
///
/// Time comes from the injected [`Clock`], so expiry is deterministic in tests.
pub struct RateCache {
    entry: RwLock<Option<CacheEntry>>,
    config: RateCacheConfig,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RateCache {
    /// Create a new rate cache.
    pub fn new(config: RateCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: RwLock::new(None),
            config,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the cached rate if still within TTL.
    pub fn get(&self) -> Option<ExchangeRate> {
        let now = self.clock.now();
        let guard = self.entry.read();

        match guard.as_ref() {
            Some(entry) if entry.is_valid(now, self.config.ttl) => {
                debug!(source = %entry.rate.source, "Cache hit");
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.rate.clone())
            }
            Some(_) => {
                debug!("Cache entry expired");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                debug!("Cache miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a freshly fetched rate, replacing any previous one.
    pub fn insert(&self, rate: ExchangeRate) {
        let entry = CacheEntry {
            rate,
            cached_at: self.clock.now(),
        };
        *self.entry.write() = Some(entry);
    }

    /// Drop the cached rate.
    pub fn clear(&self) {
        *self.entry.write() = None;
    }

    /// Age of the cached entry, valid or not.
    pub fn age(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.entry
            .read()
            .as_ref()
            .map(|entry| now.signed_duration_since(entry.cached_at))
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            age_seconds: self.age().map(|age| age.num_seconds()),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub age_seconds: Option<i64>,
}
