// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The cache-consistency gate.
//!
//! This is the sole reason the dispatch loop can run against a stale
//! informer cache without tripping over its own prior writes: after a
//! successful dispatch it memoizes the `(composition, uuid, dispatchedAt)`
//! triple and re-reads the composition directly (bypassing the list cache)
//! before trusting any further classification of that composition.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use eno_cluster_port::{ClusterError, ClusterStore};
use eno_types::{SynthesisUuid, Uid};

use crate::clock::Clock;

/// The last dispatch this reconciler instance issued, memoized purely to
/// mask informer-cache latency. Losing it on process restart is safe — at
/// worst one cycle is wasted re-reading the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoizedDispatch {
    /// The composition the dispatch was written to.
    pub composition_uid: Uid,
    /// The synthesis UUID minted for that dispatch.
    pub uuid: SynthesisUuid,
    /// When the dispatch was applied, by this reconciler's clock.
    pub dispatched_at: DateTime<Utc>,
}

/// Re-read `memo.composition_uid` and decide whether the gate is open.
///
/// Open when the freshly read composition's in-flight or current slot
/// already carries the memoized UUID, or when `grace` has elapsed since the
/// dispatch — past the grace period the gate opens unconditionally, which
/// covers a zombie leader or downstream error handler having overwritten the
/// UUID before this reconciler's cache caught up.
pub async fn is_open<S: ClusterStore>(
    store: &S,
    clock: &impl Clock,
    memo: &MemoizedDispatch,
    grace: StdDuration,
) -> Result<bool, ClusterError> {
    let composition = store.get_composition(&memo.composition_uid).await?;
    let visible = composition.is_some_and(|c| {
        c.status.in_flight_synthesis.as_ref().is_some_and(|s| s.uuid == memo.uuid)
            || c.status.current_synthesis.as_ref().is_some_and(|s| s.uuid == memo.uuid)
    });
    if visible {
        return Ok(true);
    }

    let grace = chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::zero());
    Ok(clock.now() - memo.dispatched_at >= grace)
}
