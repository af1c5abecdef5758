//! Injected clock so that near-window, TTL, and reconciler tests are
//! deterministic (design doc §6 collaborator interfaces: "all time
//! comparisons use a single injected clock").

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock backed by `chrono::Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that can be advanced manually, for reconciler/TTL tests.
///
/// Stores nanoseconds since the epoch rather than milliseconds: TTL and
/// near-window comparisons are exact-boundary (`>=`), so truncating the
/// stored instant to millisecond precision would make a clock set to
/// exactly `inserted_ts + TTL` read back a few hundred microseconds
/// *before* that boundary and miss the comparison.
#[derive(Debug)]
pub struct FixedClock {
    nanos: AtomicI64,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            nanos: AtomicI64::new(now.timestamp_nanos_opt().unwrap_or_default()),
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        self.nanos.fetch_add(
            duration.num_nanoseconds().unwrap_or(0),
            Ordering::SeqCst,
        );
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.nanos
            .store(now.timestamp_nanos_opt().unwrap_or_default(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let nanos = self.nanos.load(Ordering::SeqCst);
        DateTime::from_timestamp(
            nanos.div_euclid(1_000_000_000),
            nanos.rem_euclid(1_000_000_000) as u32,
        )
        .unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let t0 = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(clock.now(), t0 + chrono::Duration::seconds(30));
    }
}
