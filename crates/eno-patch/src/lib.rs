// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Turns a classified [`Operation`] into a JSON-Patch against a
//! composition's `/status` subresource.
//!
//! Every field the classifier reads to produce an operation is covered by a
//! `test` precondition here, so a successfully applied patch makes
//! re-classifying the refreshed composition return "no action" — the
//! idempotence law the dispatch loop (`eno-sched-core`) relies on to avoid
//! double-dispatching under a stale informer cache.

mod error;
mod ops;

pub use error::PatchBuildError;
pub use ops::{Patch, PatchOp};

use chrono::Utc;
use eno_classify::{Operation, Reason};
use eno_types::{Composition, CompositionStatus, Synthesizer, SynthesisUuid};

/// Build the JSON-Patch for `op`, which must have been produced by
/// [`eno_classify::classify`] against this exact `(synthesizer, composition)`
/// pair. The UUID for the new in-flight synthesis is minted here, not in the
/// classifier, so classification stays pure and re-runnable.
///
/// # Errors
/// Returns [`PatchBuildError`] if a field that must round-trip through
/// `serde_json` fails to serialize; this never happens for the types this
/// crate builds patches from, but the fallible path is kept explicit rather
/// than unwrapped.
pub fn build_patch(
    op: &Operation,
    synthesizer: &Synthesizer,
    composition: &Composition,
) -> Result<Patch, PatchBuildError> {
    let mut ops = Vec::new();

    if composition.status == CompositionStatus::default() {
        ops.push(PatchOp::test("/status", serde_json::Value::Null));
        ops.push(PatchOp::add("/status", serde_json::json!({})));
    }

    ops.push(PatchOp::test(
        "/status/inputRevisions",
        serde_json::to_value(&composition.status.input_revisions)?,
    ));

    match &composition.status.in_flight_synthesis {
        None => ops.push(PatchOp::test("/status/inFlightSynthesis", serde_json::Value::Null)),
        Some(in_flight) => {
            ops.push(PatchOp::test(
                "/status/inFlightSynthesis/uuid",
                serde_json::to_value(in_flight.uuid)?,
            ));
            ops.push(PatchOp::test(
                "/status/inFlightSynthesis/observedCompositionGeneration",
                serde_json::to_value(in_flight.observed_composition_generation)?,
            ));
            ops.push(PatchOp::test(
                "/status/inFlightSynthesis/synthesized",
                serde_json::to_value(&in_flight.synthesized)?,
            ));
        }
    }

    // The classifier's R3/R4/R5/R6 rules read `observedCompositionGeneration`,
    // `observedSynthesizerGeneration`, and the input-revision snapshot off the
    // *current* slot whenever it is the baseline (i.e. whenever a current
    // synthesis exists) — those reads need their own preconditions, distinct
    // from the in-flight slot's, per I4 ("every field the classifier read").
    match &composition.status.current_synthesis {
        None => ops.push(PatchOp::test("/status/currentSynthesis", serde_json::Value::Null)),
        Some(current) => {
            ops.push(PatchOp::test(
                "/status/currentSynthesis/observedCompositionGeneration",
                serde_json::to_value(current.observed_composition_generation)?,
            ));
            ops.push(PatchOp::test(
                "/status/currentSynthesis/observedSynthesizerGeneration",
                serde_json::to_value(current.observed_synthesizer_generation)?,
            ));
            ops.push(PatchOp::test(
                "/status/currentSynthesis/inputRevisions",
                serde_json::to_value(&current.input_revisions)?,
            ));
        }
    }

    let previous_attempts = if op.reason == Reason::Retry {
        composition.status.in_flight_synthesis.as_ref().map_or(0, |s| s.attempts)
    } else {
        0
    };
    let attempts = if op.reason == Reason::Retry { previous_attempts + 1 } else { 0 };

    let replacement = serde_json::json!({
        "uuid": SynthesisUuid::fresh(),
        "observedCompositionGeneration": composition.generation,
        "observedSynthesizerGeneration": synthesizer.generation,
        "initialized": Utc::now(),
        "deferred": op.reason.is_deferred(),
        "attempts": attempts,
    });
    ops.push(PatchOp::replace("/status/inFlightSynthesis", replacement));

    Ok(Patch::new(ops))
}
