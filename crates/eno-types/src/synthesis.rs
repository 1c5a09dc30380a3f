// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A single synthesis record and the three slots it can occupy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Generation, InputRevision};

/// A fresh, random identifier minted at dispatch time (I2: unique across the
/// cluster with overwhelming probability). Distinct from [`crate::Uid`],
/// which identifies the Kubernetes object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SynthesisUuid(pub Uuid);

impl SynthesisUuid {
    /// Mint a fresh, random synthesis UUID.
    ///
    /// Called only from the patch builder, never from the classifier —
    /// classification must stay idempotent and re-runnable without
    /// reserving identifiers.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SynthesisUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three named positions a [`Synthesis`] can occupy on a composition's
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynthesisSlot {
    /// Currently being produced.
    InFlight,
    /// Most recently completed synthesis.
    Current,
    /// Kept for compare/rollback.
    Previous,
}

impl SynthesisSlot {
    /// The JSON-Patch path segment for this slot under `/status`.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::InFlight => "inFlightSynthesis",
            Self::Current => "currentSynthesis",
            Self::Previous => "previousSynthesis",
        }
    }
}

/// One execution of a synthesizer for a composition.
///
/// The scheduling core only ever writes [`Synthesis::uuid`],
/// [`Synthesis::observed_composition_generation`],
/// [`Synthesis::observed_synthesizer_generation`], [`Synthesis::initialized`],
/// [`Synthesis::deferred`], and [`Synthesis::attempts`] — every other field is
/// populated downstream by the synthesizer-pod collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    /// Unique dispatch identifier.
    pub uuid: SynthesisUuid,
    /// Composition generation observed at dispatch time.
    pub observed_composition_generation: Generation,
    /// Synthesizer generation observed at dispatch time.
    pub observed_synthesizer_generation: Generation,
    /// When the core dispatched this synthesis.
    pub initialized: Option<DateTime<Utc>>,
    /// When the synthesizer program finished (written downstream).
    pub synthesized: Option<DateTime<Utc>>,
    /// When resource reconciliation completed (written downstream).
    pub reconciled: Option<DateTime<Utc>>,
    /// When the composition became ready (written downstream).
    pub ready: Option<DateTime<Utc>>,
    /// When the synthesizer pod collaborator canceled this synthesis.
    pub canceled: Option<DateTime<Utc>>,
    /// Monotonic retry counter.
    pub attempts: u32,
    /// True when this dispatch was caused by a deferred input or a
    /// synthesizer upgrade (subject to the cluster-wide cooldown).
    pub deferred: bool,
    /// Snapshot of input revisions at the moment synthesis completes
    /// (written downstream, empty while in flight).
    #[serde(default)]
    pub input_revisions: Vec<InputRevision>,
}

impl Synthesis {
    /// True if this synthesis has not yet completed (`synthesized` unset).
    ///
    /// Invariant I1 requires at most one slot on a composition to satisfy
    /// this at any time.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.synthesized.is_none()
    }

    /// True if the synthesizer-pod collaborator canceled this synthesis.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> Synthesis {
        Synthesis {
            uuid: SynthesisUuid::fresh(),
            observed_composition_generation: Generation(1),
            observed_synthesizer_generation: Generation(1),
            initialized: Some(Utc::now()),
            synthesized: None,
            reconciled: None,
            ready: None,
            canceled: None,
            attempts: 0,
            deferred: false,
            input_revisions: vec![],
        }
    }

    #[test]
    fn in_flight_until_synthesized_set() {
        let mut s = blank();
        assert!(s.is_in_flight());
        s.synthesized = Some(Utc::now());
        assert!(!s.is_in_flight());
    }

    #[test]
    fn fresh_uuids_are_distinct() {
        assert_ne!(SynthesisUuid::fresh(), SynthesisUuid::fresh());
    }

    #[test]
    fn slot_field_names_are_stable() {
        assert_eq!(SynthesisSlot::InFlight.field_name(), "inFlightSynthesis");
        assert_eq!(SynthesisSlot::Current.field_name(), "currentSynthesis");
        assert_eq!(SynthesisSlot::Previous.field_name(), "previousSynthesis");
    }
}
