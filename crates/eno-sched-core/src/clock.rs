// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Clock as a port.
//!
//! `eno-classify` stays a pure function of its inputs by never calling
//! [`chrono::Utc::now`] itself; every "now" the dispatch loop needs (the
//! cooldown tracker, the cache-consistency gate, the retry backoff's
//! `notBefore` comparison) is read from a [`Clock`] injected here instead,
//! so tests can hold time still or fast-forward it deterministically.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock, backed by [`chrono::Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock tests can set and advance without sleeping.
pub struct FakeClock {
    millis_since_epoch: AtomicI64,
}

impl FakeClock {
    /// A fake clock starting at `start`.
    #[must_use]
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { millis_since_epoch: AtomicI64::new(start.timestamp_millis()) }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: chrono::Duration) {
        self.millis_since_epoch.fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis_since_epoch.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_by_exact_duration() {
        let start = DateTime::from_timestamp_millis(1_700_000_000_000).expect("valid timestamp");
        let clock = FakeClock::at(start);
        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(5));
    }

    #[test]
    fn fake_clock_is_stable_without_advancing() {
        let start = DateTime::from_timestamp_millis(1_700_000_000_000).expect("valid timestamp");
        let clock = FakeClock::at(start);
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, second);
    }
}
