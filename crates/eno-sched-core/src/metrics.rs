// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dispatch-loop metrics.
//!
//! These are thin wrappers over the `metrics` facade's global recorder —
//! whichever exporter the embedding binary installs (`eno-schedulerd` wires
//! a Prometheus one) receives them. Nothing in this crate depends on a
//! specific recorder.

/// Free slots under the concurrency limit, published every tick.
/// `free_slots + in_flight` always equals the configured limit.
pub fn set_free_slots(free: u32) {
    metrics::gauge!("eno_scheduler_free_slots").set(f64::from(free));
}

/// Count of in-flight syntheses observed this tick.
pub fn set_in_flight(count: u32) {
    metrics::gauge!("eno_scheduler_in_flight").set(f64::from(count));
}

/// Wall-clock time a single dispatch-loop tick took to run.
pub fn record_tick_duration(duration: std::time::Duration) {
    metrics::histogram!("eno_scheduler_tick_duration_seconds").record(duration.as_secs_f64());
}

/// Compositions currently past the watchdog threshold.
pub fn set_stuck_reconciling(count: u32) {
    metrics::gauge!("eno_scheduler_stuck_reconciling").set(f64::from(count));
}

/// A composition was skipped because its synthesizer no longer exists.
pub fn record_missing_synthesizer() {
    metrics::counter!("eno_scheduler_missing_synthesizer_total").increment(1);
}

/// A dispatched patch's `test` precondition failed — a concurrent writer
/// won the race.
pub fn record_patch_rejected() {
    metrics::counter!("eno_scheduler_patch_rejected_total").increment(1);
}

/// A successfully applied dispatch, tagged by its operation reason.
pub fn record_dispatch(reason: &str) {
    metrics::counter!("eno_scheduler_dispatched_total", "reason" => reason.to_string()).increment(1);
}

/// A data-model invariant was violated — a programmer bug, not cluster
/// churn.
pub fn record_invariant_violation() {
    metrics::counter!("eno_scheduler_invariant_violations_total").increment(1);
}
