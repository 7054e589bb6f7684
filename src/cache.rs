//! TTL cache entry and clock abstraction shared by the forecast and route caches.
//!
//! Each cache owns its own `CacheEntry`; entries are never shared between caches.
//! Time is read through [`Clock`] so tests can drive expiry with a fake clock.

use chrono::{DateTime, Duration, Utc};

/// Source of "now". Wall-clock conversion happens where a time zone is known.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A cached value with the time it was fetched and its time-to-live.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at,
            ttl,
        }
    }

    /// `true` while `now - fetched_at < ttl`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < self.ttl
    }

    /// Seconds since the value was fetched (negative if the clock went backwards).
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.fetched_at).num_seconds()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_entry_valid_within_ttl() {
        let entry = CacheEntry::new(1, at("2026-03-01T10:00:00+00:00"), Duration::seconds(600));
        assert!(entry.is_valid(at("2026-03-01T10:09:59+00:00")));
    }

    #[test]
    fn test_entry_invalid_at_exact_ttl() {
        // Validity is strict: age == ttl is already stale
        let entry = CacheEntry::new(1, at("2026-03-01T10:00:00+00:00"), Duration::seconds(600));
        assert!(!entry.is_valid(at("2026-03-01T10:10:00+00:00")));
    }

    #[test]
    fn test_entry_age_across_offsets() {
        let entry = CacheEntry::new((), at("2026-03-01T10:00:00+00:00"), Duration::seconds(60));
        assert_eq!(entry.age_secs(at("2026-03-01T05:00:30-05:00")), 30);
    }

    #[test]
    fn test_fake_clock_advances() {
        let clock = testing::FakeClock::at("2026-03-01T10:00:00+00:00");
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), at("2026-03-01T10:05:00+00:00"));
    }
}
