// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The namespaced Composition object and its synthesis status.

use serde::{Deserialize, Serialize};

use crate::{Generation, InputRevision, InvariantViolation, Synthesis, SynthesisSlot, SynthesisUuid, Uid};

/// A composition-side mapping of a ref key to a concrete resource reference.
///
/// The referenced resource's identity is opaque to the scheduling core — it
/// never dereferences bindings, only counts and names them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// The synthesizer ref key this binding satisfies.
    pub key: String,
}

/// The three synthesis slots plus the input-revision snapshot the classifier
/// compares against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionStatus {
    /// Latest observed version of every bound input, written by the
    /// input-watch collaborator.
    #[serde(default)]
    pub input_revisions: Vec<InputRevision>,
    /// Currently being produced.
    pub in_flight_synthesis: Option<Synthesis>,
    /// Most recently completed synthesis.
    pub current_synthesis: Option<Synthesis>,
    /// Kept for compare/rollback.
    pub previous_synthesis: Option<Synthesis>,
}

impl CompositionStatus {
    /// The "active slot": in-flight if present, otherwise current.
    #[must_use]
    pub fn active_synthesis(&self) -> Option<&Synthesis> {
        self.in_flight_synthesis.as_ref().or(self.current_synthesis.as_ref())
    }

    /// Which named slot is active, if any.
    #[must_use]
    pub fn active_slot(&self) -> Option<SynthesisSlot> {
        if self.in_flight_synthesis.is_some() {
            Some(SynthesisSlot::InFlight)
        } else if self.current_synthesis.is_some() {
            Some(SynthesisSlot::Current)
        } else {
            None
        }
    }

    /// An input revision snapshot by key, from `status.inputRevisions`.
    #[must_use]
    pub fn input_revision(&self, key: &str) -> Option<&InputRevision> {
        self.input_revisions.iter().find(|r| r.key == key)
    }

    /// Invariant I1: at most one slot may have `synthesized == None`.
    ///
    /// `in_flight_synthesis` is the only slot the scheduling core ever leaves
    /// incomplete; `current_synthesis`/`previous_synthesis` must always be
    /// complete by the time they're promoted into those slots. A composition
    /// failing this check indicates a collaborator wrote state the core
    /// cannot safely reason about.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let unfinished = [&self.current_synthesis, &self.previous_synthesis]
            .into_iter()
            .flatten()
            .filter(|s| s.is_in_flight())
            .count();
        if unfinished > 0 {
            return Err(InvariantViolation::MultipleInFlight);
        }
        Ok(())
    }
}

/// The cleanup finalizer the core requires before it will ever classify a
/// composition for synthesis.
pub const CLEANUP_FINALIZER: &str = "eno.azure.io/cleanup";

/// A namespaced composition: a reference to a synthesizer plus a set of
/// input bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    /// Cluster object UID.
    pub uid: Uid,
    /// Object name.
    pub name: String,
    /// Object namespace.
    pub namespace: String,
    /// Monotonic generation, bumped by spec edits.
    pub generation: Generation,
    /// The synthesizer to run.
    pub synthesizer_name: String,
    /// Bindings satisfying some subset of the synthesizer's refs.
    pub bindings: Vec<Binding>,
    /// Suppresses non-forced dispatch when set (guard G2).
    pub ignore_side_effects: bool,
    /// `forceResynthesis(uuid)` annotation — when present and referencing the
    /// latest synthesis UUID, forces a resynthesis regardless of other state.
    pub force_resynthesis: Option<SynthesisUuid>,
    /// True once the cleanup finalizer has been applied.
    pub has_cleanup_finalizer: bool,
    /// True while the object is being deleted.
    pub deleting: bool,
    /// The synth-epoch fingerprint last annotated onto this object by the
    /// dispatch loop's two-phase `SynthesizerModified` write, if any. `None`
    /// until the first such annotation; compared against the current epoch
    /// hash to tell phase 1 (write the annotation) from phase 2 (the
    /// annotation has already round-tripped through this informer's cache,
    /// so the dispatch itself may proceed).
    #[serde(default)]
    pub synth_epoch: Option<u64>,
    /// Synthesis status: input revisions and the three slots.
    pub status: CompositionStatus,
}

impl Composition {
    /// True when `bindings` names `key` (i.e. the synthesizer ref `key` is
    /// bound on this composition).
    #[must_use]
    pub fn has_binding(&self, key: &str) -> bool {
        self.bindings.iter().any(|b| b.key == key)
    }

    /// The latest synthesis UUID across all three slots, by recency of
    /// `initialized` timestamp among set slots, falling back to in-flight
    /// then current then previous when timestamps tie or are absent.
    ///
    /// Used to evaluate the `forceResynthesis(uuid)` annotation (rule R2):
    /// the annotation must reference *this* UUID, not a stale one, so a
    /// single force-resynthesis request cannot fire twice.
    #[must_use]
    pub fn latest_synthesis_uuid(&self) -> Option<SynthesisUuid> {
        self.status
            .in_flight_synthesis
            .as_ref()
            .or(self.status.current_synthesis.as_ref())
            .or(self.status.previous_synthesis.as_ref())
            .map(|s| s.uuid)
    }
}
