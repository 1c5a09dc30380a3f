// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The dispatch loop: list, classify, select, enforce limits, dispatch.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::Utc;
use eno_classify::{classify, Operation, Reason};
use eno_cluster_port::{ClusterError, ClusterStore};
use eno_config::scheduler_config::SchedulerConfig;
use eno_patch::{build_patch, PatchBuildError};
use eno_types::{Composition, InvariantViolation, Synthesizer};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::gate::{self, MemoizedDispatch};
use crate::{cooldown, epoch, metrics, watchdog};

/// Fallback delay when a tick has nothing else to wait on — e.g. idle with
/// no pending operations. Production deployments are driven by watch
/// events, where every event enqueues the same synthetic request; this
/// constant only matters to [`Scheduler::run`]'s free-standing poll loop,
/// used by `eno-schedulerd` in the absence of a real watch integration.
const DEFAULT_IDLE_POLL: StdDuration = StdDuration::from_secs(5);

/// A short, fixed delay used while the cache-consistency gate is closed —
/// deliberately much shorter than [`DEFAULT_IDLE_POLL`] so the gate is
/// re-checked promptly once it's likely to open.
const GATE_RECHECK_DELAY: StdDuration = StdDuration::from_millis(50);

/// Failures the dispatch loop cannot route to "log and continue this
/// composition" — either an apiserver error or a detected programmer bug,
/// either of which fails the tick outright.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A cluster read or write failed — transient, or a failed `test`
    /// precondition.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    /// The patch builder failed to serialize a field.
    #[error(transparent)]
    PatchBuild(#[from] PatchBuildError),
    /// A data-model invariant was violated.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// What one [`Scheduler::tick`] call did, and when to call it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// The composition dispatched this tick, if any.
    pub dispatched: Option<eno_types::Uid>,
    /// How long to wait before the next tick. `None` means "no particular
    /// constraint" — [`Scheduler::run`] falls back to [`DEFAULT_IDLE_POLL`].
    pub requeue_after: Option<StdDuration>,
}

impl TickOutcome {
    const fn idle() -> Self {
        Self { dispatched: None, requeue_after: Some(DEFAULT_IDLE_POLL) }
    }

    const fn after(delay: StdDuration) -> Self {
        Self { dispatched: None, requeue_after: Some(delay) }
    }

    const fn immediate() -> Self {
        Self { dispatched: None, requeue_after: None }
    }
}

/// The single-writer scheduling core: classifies every composition against
/// its synthesizer, picks the highest-priority pending operation, and
/// dispatches it under the concurrency limit and deferred-operation
/// cooldown.
///
/// Holds no cluster state of its own beyond the memoized last dispatch —
/// every tick re-reads the cluster from `store` and reasons over the fresh
/// snapshot.
pub struct Scheduler<S, C> {
    store: S,
    clock: C,
    config: SchedulerConfig,
    last_dispatch: Mutex<Option<MemoizedDispatch>>,
}

impl<S, C> Scheduler<S, C>
where
    S: ClusterStore,
    C: Clock,
{
    /// Construct a scheduler over `store`, reading time from `clock` and
    /// parameterized by `config`.
    pub fn new(store: S, clock: C, config: SchedulerConfig) -> Self {
        Self { store, clock, config, last_dispatch: Mutex::new(None) }
    }

    /// Run [`Scheduler::tick`] forever, sleeping between calls for whatever
    /// delay the previous tick requested (or [`DEFAULT_IDLE_POLL`] absent a
    /// specific one). Returns only on an unrecoverable error from `tick`;
    /// no error here is fatal to the *process*, but `run` itself has no
    /// further retry policy of its own — the embedding binary decides
    /// whether to restart it.
    pub async fn run(&self) -> Result<(), DispatchError> {
        loop {
            let outcome = self.tick().await?;
            let delay = outcome.requeue_after.unwrap_or(DEFAULT_IDLE_POLL);
            if delay > StdDuration::ZERO {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Run one reconciliation tick: gate check, classify, select, dispatch.
    #[instrument(skip(self), fields(dispatched = tracing::field::Empty))]
    pub async fn tick(&self) -> Result<TickOutcome, DispatchError> {
        let tick_started = std::time::Instant::now();
        let outcome = self.tick_inner().await;
        metrics::record_tick_duration(tick_started.elapsed());
        outcome
    }

    async fn tick_inner(&self) -> Result<TickOutcome, DispatchError> {
        // Step 1: a prior dispatch may still be invisible to this
        // reconciler's cache. Until the gate opens, nothing else this tick
        // can be trusted to reflect the composition's true state.
        {
            let mut memo_guard = self.last_dispatch.lock().await;
            if let Some(memo) = memo_guard.as_ref() {
                let open = gate::is_open(&self.store, &self.clock, memo, self.config.cache_grace_period()).await?;
                if !open {
                    debug!(composition = %memo.composition_uid, "cache-consistency gate still closed");
                    return Ok(TickOutcome::after(GATE_RECHECK_DELAY));
                }
                *memo_guard = None;
            }
        }

        // Step 2: synthesizers, sorted, and this tick's epoch fingerprint.
        let mut synthesizers = self.store.list_synthesizers().await?;
        synthesizers.sort_by(|a, b| a.name.cmp(&b.name));
        let epoch = epoch::epoch_hash(&synthesizers);
        let synth_by_name: HashMap<&str, &Synthesizer> =
            synthesizers.iter().map(|s| (s.name.as_str(), s)).collect();

        // Step 3: classify every composition, tracking in-flight count and
        // the watchdog as we go.
        let compositions = self.store.list_compositions().await?;
        let cooldown_deadline = cooldown::next_deferred_dispatch_at(&compositions, self.config.cooldown_period());
        let now = self.clock.now();

        let mut in_flight_count: u32 = 0;
        let mut stuck_count: u32 = 0;
        let mut candidates: Vec<Operation> = Vec::new();

        for composition in &compositions {
            composition.status.check_invariants().inspect_err(|_| metrics::record_invariant_violation())?;

            if composition.status.in_flight_synthesis.as_ref().is_some_and(eno_types::Synthesis::is_in_flight) {
                in_flight_count += 1;
            }
            if watchdog::is_stuck(composition, now, self.config.watchdog_threshold()) {
                stuck_count += 1;
                warn!(composition = %composition.uid, "composition missed its reconciliation deadline");
            }

            let Some(synthesizer) = synth_by_name.get(composition.synthesizer_name.as_str()) else {
                metrics::record_missing_synthesizer();
                continue;
            };

            if let Some(mut op) = classify(synthesizer, composition) {
                if op.reason.is_deferred() {
                    if let Some(deadline) = cooldown_deadline {
                        op.not_before = Some(deadline);
                    }
                }
                candidates.push(op);
            }
        }

        metrics::set_in_flight(in_flight_count);
        metrics::set_stuck_reconciling(stuck_count);

        let free_slots = self.config.concurrency_limit.saturating_sub(in_flight_count);
        metrics::set_free_slots(free_slots);
        if free_slots == 0 {
            debug!(limit = self.config.concurrency_limit, "concurrency limit reached");
            return Ok(TickOutcome::idle());
        }

        // Step 3 (cont'd): smallest operation under the total order wins.
        let Some(chosen) = candidates.into_iter().min() else {
            return Ok(TickOutcome::idle());
        };

        // Step 5: a deferred op may not be ready yet.
        if let Some(not_before) = chosen.not_before {
            if not_before > now {
                let wait = (not_before - now).to_std().unwrap_or(DEFAULT_IDLE_POLL);
                debug!(composition = %chosen.composition_uid, wait_ms = wait.as_millis() as u64, "operation not yet due");
                return Ok(TickOutcome::after(wait));
            }
        }

        let Some(composition) = compositions.iter().find(|c| c.uid == chosen.composition_uid) else {
            return Ok(TickOutcome::idle());
        };
        let Some(synthesizer) = synth_by_name.get(composition.synthesizer_name.as_str()) else {
            return Ok(TickOutcome::idle());
        };

        // Step 6: synthesizer rollouts bounce through an epoch annotation
        // first, so the composition-informer stream carries the change
        // before the actual dispatch patch lands. Phase 1 only runs once per
        // epoch per composition — once `synth_epoch` already matches the
        // current epoch hash, this composition has already round-tripped
        // through the informer and phase 2 (the real dispatch) proceeds
        // below instead of writing the same annotation forever.
        if chosen.reason == Reason::SynthesizerModified && composition.synth_epoch != Some(epoch) {
            info!(composition = %chosen.composition_uid, epoch, "writing synth-epoch annotation ahead of rollout dispatch");
            self.store.set_synth_epoch_annotation(&chosen.composition_uid, epoch).await?;
            return Ok(TickOutcome::immediate());
        }

        // Step 7: build and apply the patch.
        let patch = build_patch(&chosen, synthesizer, composition)?;
        match self.store.apply_patch(&chosen.composition_uid, &patch).await {
            Ok(()) => {
                if let Some(uuid) = patch.minted_uuid() {
                    *self.last_dispatch.lock().await = Some(MemoizedDispatch {
                        composition_uid: chosen.composition_uid.clone(),
                        uuid,
                        dispatched_at: now,
                    });
                }
                metrics::record_dispatch(reason_label(chosen.reason));
                info!(composition = %chosen.composition_uid, reason = reason_label(chosen.reason), "dispatched synthesis");
                Ok(TickOutcome { dispatched: Some(chosen.composition_uid), requeue_after: None })
            }
            Err(ClusterError::Invalid(reason)) => {
                metrics::record_patch_rejected();
                warn!(composition = %chosen.composition_uid, %reason, "dispatch precondition failed, another writer won the race");
                Err(DispatchError::Cluster(ClusterError::Invalid(reason)))
            }
            Err(other) => Err(DispatchError::Cluster(other)),
        }
    }

    /// The injected clock, for embedding code that needs consistent time
    /// (e.g. `eno-schedulerd`'s metrics timestamps).
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The underlying cluster store, for introspection in tests and
    /// debug tooling — the dispatch loop itself never needs this beyond
    /// `tick`'s own calls.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

const fn reason_label(reason: Reason) -> &'static str {
    match reason {
        Reason::Initial => "initial",
        Reason::ForcedResynthesis => "forced_resynthesis",
        Reason::CompositionModified => "composition_modified",
        Reason::InputModified => "input_modified",
        Reason::DeferredInputModified => "deferred_input_modified",
        Reason::SynthesizerModified => "synthesizer_modified",
        Reason::Retry => "retry",
    }
}

#[allow(dead_code)]
fn assert_free_slots_invariant(limit: u32, in_flight: u32, free: u32) {
    debug_assert_eq!(limit.saturating_sub(in_flight), free, "free_slots + in_flight must equal the configured limit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use eno_cluster_port::InMemoryClusterStore;
    use eno_types::{Binding, CompositionStatus, Generation, RefDef, Uid};

    fn synthesizer(name: &str, generation: i64) -> Synthesizer {
        Synthesizer {
            uid: Uid::from(format!("{name}-uid")),
            name: name.into(),
            generation: Generation(generation),
            refs: vec![RefDef::eager("a")],
        }
    }

    fn fresh_composition(name: &str, synthesizer_name: &str) -> Composition {
        Composition {
            uid: Uid::from(name),
            name: name.into(),
            namespace: "default".into(),
            generation: Generation(1),
            synthesizer_name: synthesizer_name.into(),
            bindings: vec![Binding { key: "a".into() }],
            ignore_side_effects: false,
            force_resynthesis: None,
            has_cleanup_finalizer: true,
            deleting: false,
            synth_epoch: None,
            status: CompositionStatus {
                input_revisions: vec![eno_types::InputRevision { revision: Some(1), ..eno_types::InputRevision::new("a") }],
                ..CompositionStatus::default()
            },
        }
    }

    #[tokio::test]
    async fn initial_synthesis_dispatches_on_the_first_tick() {
        let s = synthesizer("s1", 1);
        let c = fresh_composition("c1", "s1");
        let store = InMemoryClusterStore::seeded(vec![c.clone()], vec![s]);
        let clock = FakeClock::at(Utc::now());
        let scheduler = Scheduler::new(store, clock, SchedulerConfig::default());

        let outcome = scheduler.tick().await.expect("tick succeeds");
        assert_eq!(outcome.dispatched, Some(Uid::from("c1")));

        let updated = scheduler.store.get_composition(&Uid::from("c1")).await.unwrap().unwrap();
        assert!(updated.status.in_flight_synthesis.is_some());
        assert_eq!(
            updated.status.in_flight_synthesis.as_ref().unwrap().observed_composition_generation,
            Generation(1)
        );
    }

    #[tokio::test]
    async fn concurrency_limit_caps_simultaneous_dispatches() {
        let s = synthesizer("s1", 1);
        let compositions: Vec<_> = (0..10).map(|i| fresh_composition(&format!("c{i}"), "s1")).collect();
        let store = InMemoryClusterStore::seeded(compositions, vec![s]);
        let clock = FakeClock::at(Utc::now());
        let config = SchedulerConfig { concurrency_limit: 3, ..SchedulerConfig::default() };
        let scheduler = Scheduler::new(store, clock, config);

        for _ in 0..3 {
            let outcome = scheduler.tick().await.expect("tick succeeds");
            assert!(outcome.dispatched.is_some());
        }

        let outcome = scheduler.tick().await.expect("tick succeeds");
        assert_eq!(outcome.dispatched, None, "fourth dispatch blocked by the concurrency limit");
    }

    #[tokio::test]
    async fn no_candidates_requeues_idle() {
        let store = InMemoryClusterStore::seeded(vec![], vec![]);
        let clock = FakeClock::at(Utc::now());
        let scheduler = Scheduler::new(store, clock, SchedulerConfig::default());
        let outcome = scheduler.tick().await.expect("tick succeeds");
        assert_eq!(outcome, TickOutcome::idle());
    }
}
