// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Retry backoff for canceled in-flight syntheses.

use chrono::{DateTime, Duration, Utc};

/// Minimum delay enforced even for a synthesis canceled on its very first
/// attempt (`initialized == canceled`), when the formula's base interval
/// would otherwise be zero and retries could hot-loop.
///
/// Chosen to match the scheduler's own tick granularity elsewhere in this
/// crate, so a pathologically short first attempt can't hot-loop the
/// dispatch loop.
pub const MIN_RETRY_DELAY: Duration = Duration::seconds(1);

/// The earliest instant a canceled synthesis may be retried.
///
/// `retryAt = canceledAt + (canceledAt - initializedAt) * attempts * 1.5`,
/// clamped so the computed delay is never below [`MIN_RETRY_DELAY`].
/// `attempts` is the retry count already made,
/// matching [`crate::Operation`]'s reading of `Synthesis::attempts` before
/// the retry being scheduled is counted.
#[must_use]
pub fn retry_not_before(
    initialized: DateTime<Utc>,
    canceled: DateTime<Utc>,
    attempts: u32,
) -> DateTime<Utc> {
    let base = canceled - initialized;
    let base = if base < Duration::zero() { Duration::zero() } else { base };
    let scaled_ms = (base.num_milliseconds() as f64) * f64::from(attempts) * 1.5;
    let delay = Duration::milliseconds(scaled_ms as i64);
    let delay = if delay < MIN_RETRY_DELAY { MIN_RETRY_DELAY } else { delay };
    canceled + delay
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_still_gets_minimum_delay() {
        let initialized = Utc::now();
        let canceled = initialized + Duration::seconds(10);
        let not_before = retry_not_before(initialized, canceled, 0);
        assert_eq!(not_before, canceled + MIN_RETRY_DELAY);
    }

    #[test]
    fn scales_with_attempts_and_initial_interval() {
        let initialized = Utc::now();
        let canceled = initialized + Duration::seconds(10);
        let first = retry_not_before(initialized, canceled, 1);
        let second = retry_not_before(initialized, canceled, 2);
        assert_eq!(first, canceled + Duration::milliseconds(15_000));
        assert_eq!(second, canceled + Duration::milliseconds(30_000));
        assert!(second > first);
    }

    #[test]
    fn never_retries_before_the_cancellation_instant() {
        let initialized = Utc::now();
        let canceled = initialized - Duration::seconds(1);
        let not_before = retry_not_before(initialized, canceled, 5);
        assert!(not_before >= canceled);
    }
}
