// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The operation classifier: guards G1/G2 and rules R1–R7.

use eno_types::{Composition, InputRevision, RefDef, Synthesis, Synthesizer};

use crate::backoff::retry_not_before;
use crate::operation::rollout_key;
use crate::{Operation, Reason};

/// Classify `(synthesizer, composition)` into at most one operation.
///
/// Read-only on both inputs, deterministic, and referentially transparent:
/// calling it twice with equal inputs always returns equal outputs, and it
/// never mutates anything — the dispatch loop (`eno-sched-core`) is the only
/// collaborator that turns the result into a write.
#[must_use]
pub fn classify(synthesizer: &Synthesizer, composition: &Composition) -> Option<Operation> {
    if guard_blocks_all_action(synthesizer, composition) {
        return None;
    }

    let Some(active) = composition.status.active_synthesis() else {
        return Some(simple_op(composition, Reason::Initial));
    };

    if let Some(forced) = composition.force_resynthesis {
        if Some(forced) == composition.latest_synthesis_uuid() {
            return Some(simple_op(composition, Reason::ForcedResynthesis));
        }
    }

    if active.observed_composition_generation != composition.generation {
        return Some(simple_op(composition, Reason::CompositionModified));
    }

    if guard_side_effects_suppressed(composition) {
        return None;
    }

    let in_flight = composition.status.in_flight_synthesis.is_some();

    // R4/R5 compare against the *active* slot's own snapshot (in-flight if
    // present, otherwise current) — never against `current_synthesis`
    // unconditionally. A freshly dispatched in-flight synthesis starts with
    // an empty snapshot, so every ref lookup against it misses and
    // `ref_input_modified` reports not-yet-comparable rather than "changed";
    // that is what keeps a composition from immediately re-triggering R4/R5
    // against itself on the very next tick, even while an older, stale
    // `current_synthesis` is still sitting in the other slot.
    if any_ref_input_modified(synthesizer, active, &composition.status.input_revisions, false) {
        return Some(simple_op(composition, Reason::InputModified));
    }

    if !in_flight && any_ref_input_modified(synthesizer, active, &composition.status.input_revisions, true) {
        return Some(simple_op(composition, Reason::DeferredInputModified));
    }

    if !in_flight
        && active.observed_synthesizer_generation.0 > 0
        && active.observed_synthesizer_generation < synthesizer.generation
    {
        let hash = rollout_key(&synthesizer.uid, synthesizer.generation, &composition.uid);
        return Some(Operation {
            composition_uid: composition.uid.clone(),
            reason: Reason::SynthesizerModified,
            not_before: None,
            rollout_hash: Some(hash),
        });
    }

    if let Some(in_flight_synthesis) = &composition.status.in_flight_synthesis {
        if let (Some(canceled), Some(initialized)) =
            (in_flight_synthesis.canceled, in_flight_synthesis.initialized)
        {
            let not_before = retry_not_before(initialized, canceled, in_flight_synthesis.attempts);
            return Some(Operation {
                composition_uid: composition.uid.clone(),
                reason: Reason::Retry,
                not_before: Some(not_before),
                rollout_hash: None,
            });
        }
    }

    None
}

/// Guard G1: deletion, missing finalizer, unsatisfied refs, or an
/// out-of-lockstep input set all block every rule unconditionally.
fn guard_blocks_all_action(synthesizer: &Synthesizer, composition: &Composition) -> bool {
    composition.deleting
        || !composition.has_cleanup_finalizer
        || !synthesizer.refs_satisfied_by(composition.status.input_revisions.iter().map(|r| r.key.as_str()))
        || is_out_of_lockstep(&composition.status.input_revisions)
}

/// True when any two input revisions disagree on their cross-input
/// `revision`.
fn is_out_of_lockstep(revisions: &[InputRevision]) -> bool {
    revisions
        .iter()
        .enumerate()
        .any(|(i, a)| revisions[i + 1..].iter().any(|b| a.conflicts_on_revision(b)))
}

/// Guard G2: a composition-wide `ignoreSideEffects` opt-out blocks R4–R6
/// unless some input revision explicitly opts back in
/// (`ignoreSideEffects=false`), matching the asymmetric rule in
/// [`InputRevision::change_is_suppressed`].
fn guard_side_effects_suppressed(composition: &Composition) -> bool {
    composition.ignore_side_effects
        && !composition
            .status
            .input_revisions
            .iter()
            .any(|rev| rev.ignore_side_effects == Some(false))
}

/// True when some ref of the given deferredness moved between `baseline`'s
/// recorded snapshot and `current`.
///
/// A ref with no recorded entry in `baseline`'s snapshot is treated as
/// not-yet-comparable rather than "changed", so a composition's very first
/// synthesis — whose in-flight slot starts with an empty snapshot, since
/// the dispatch patch never populates it at dispatch time — never
/// re-triggers itself on the next tick, preserving the idempotence law.
fn any_ref_input_modified(
    synthesizer: &Synthesizer,
    baseline: &Synthesis,
    current: &[InputRevision],
    deferred: bool,
) -> bool {
    synthesizer
        .refs
        .iter()
        .filter(|r| r.defer == deferred)
        .any(|r| ref_input_modified(r, baseline, current))
}

fn ref_input_modified(r: &RefDef, baseline: &Synthesis, current: &[InputRevision]) -> bool {
    let Some(latest) = current.iter().find(|rev| rev.key == r.key) else {
        return false;
    };
    let Some(observed) = baseline.input_revisions.iter().find(|rev| rev.key == r.key) else {
        return false;
    };
    !observed.change_is_suppressed(latest) && observed.is_older_than(latest)
}

fn simple_op(composition: &Composition, reason: Reason) -> Operation {
    Operation {
        composition_uid: composition.uid.clone(),
        reason,
        not_before: None,
        rollout_hash: None,
    }
}
