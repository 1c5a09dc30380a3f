// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stuck-reconciling detection.
//!
//! A composition is "stuck" when its active synthesis has been in flight
//! longer than the configured watchdog threshold without completing. This
//! never changes what the dispatch loop does — it is purely an operator
//! signal surfaced via [`crate::metrics`] and `tracing::warn!`.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use eno_types::Composition;

/// True when `composition`'s active synthesis has missed its reconciliation
/// deadline: still unfinished (`synthesized` unset) and `initialized` longer
/// ago than `threshold`.
#[must_use]
pub fn is_stuck(composition: &Composition, now: DateTime<Utc>, threshold: StdDuration) -> bool {
    let threshold = chrono::Duration::from_std(threshold).unwrap_or_else(|_| chrono::Duration::zero());
    composition.status.active_synthesis().is_some_and(|synthesis| {
        synthesis.synthesized.is_none() && synthesis.initialized.is_some_and(|initialized| now - initialized > threshold)
    })
}
