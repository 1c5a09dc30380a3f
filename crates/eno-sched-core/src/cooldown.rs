// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The cluster-wide deferred-operation cooldown.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use eno_types::Composition;

/// The earliest instant a deferred operation may dispatch, or `None` if no
/// deferred synthesis has ever been dispatched (in which case the very
/// first deferred operation is unconstrained).
///
/// Computed as the max over every composition's three slots of `initialized`
/// timestamps on syntheses marked `deferred=true`, plus `cooldown_period`.
/// The dispatch loop recomputes this every tick from the
/// authoritative composition list, so it self-corrects as syntheses
/// complete and new ones dispatch — there is no separate persisted cooldown
/// state.
#[must_use]
pub fn next_deferred_dispatch_at(compositions: &[Composition], cooldown_period: StdDuration) -> Option<DateTime<Utc>> {
    let cooldown = chrono::Duration::from_std(cooldown_period).unwrap_or_else(|_| chrono::Duration::zero());
    compositions
        .iter()
        .flat_map(|c| {
            [
                c.status.in_flight_synthesis.as_ref(),
                c.status.current_synthesis.as_ref(),
                c.status.previous_synthesis.as_ref(),
            ]
        })
        .flatten()
        .filter(|synthesis| synthesis.deferred)
        .filter_map(|synthesis| synthesis.initialized)
        .max()
        .map(|latest| latest + cooldown)
}
