// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A candidate scheduling operation and its deterministic total order.

use chrono::{DateTime, Utc};
use eno_types::Uid;
use fnv::FnvHasher;
use std::hash::{Hash, Hasher};

use eno_types::Generation;

use crate::Reason;

/// A deterministic permutation of the rollout order for `SynthesizerModified`
/// operations sharing a synthesizer generation, derived from the 64-bit
/// FNV-1a hash of `(synthesizer_uid, synthesizer_generation, composition_uid)`
/// with its bits reversed.
///
/// Reversing the hash's bits (rather than using it directly) spreads rollout
/// order across the low bits of the FNV output, the ones that mix least on
/// their own. Folding the generation into the hash gives each rollout of the
/// same synthesizer a fresh permutation.
#[must_use]
pub fn rollout_key(synthesizer_uid: &Uid, synthesizer_generation: Generation, composition_uid: &Uid) -> u64 {
    let mut hasher = FnvHasher::default();
    synthesizer_uid.0.hash(&mut hasher);
    synthesizer_generation.0.hash(&mut hasher);
    composition_uid.0.hash(&mut hasher);
    hasher.finish().reverse_bits()
}

/// A single unit of work the classifier proposes for one composition.
///
/// `Operation` carries only what the total order needs to compare
/// candidates against each other; the patch itself is built
/// separately by `eno-patch` once an operation is selected for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The composition this operation acts on.
    pub composition_uid: Uid,
    /// Why this operation was proposed.
    pub reason: Reason,
    /// Earliest instant this operation may be dispatched; `None` is treated
    /// as "no constraint", ordering ahead of any `Some` value.
    pub not_before: Option<DateTime<Utc>>,
    /// Rollout permutation key, set only for [`Reason::SynthesizerModified`]
    /// operations (see [`rollout_key`]); `None` for every other reason.
    pub rollout_hash: Option<u64>,
}

impl Operation {
    /// The tuple this operation sorts by: reason rank is the overriding key,
    /// `not_before` and `rollout_hash` only break ties *within* a shared
    /// reason, and the composition UID is the final, total tie-break so two
    /// otherwise-identical operations never compare equal.
    fn sort_key(&self) -> (Reason, Option<DateTime<Utc>>, Option<u64>, &str) {
        (self.reason, self.not_before, self.rollout_hash, self.composition_uid.0.as_str())
    }
}

impl PartialOrd for Operation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Operation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(reason: Reason, uid: &str) -> Operation {
        Operation {
            composition_uid: Uid::from(uid),
            reason,
            not_before: None,
            rollout_hash: None,
        }
    }

    #[test]
    fn reason_rank_dominates_every_other_field() {
        let mut initial = op(Reason::Initial, "z");
        initial.not_before = Some(Utc::now() + chrono::Duration::hours(1));
        let retry = op(Reason::Retry, "a");
        assert!(initial < retry);
    }

    #[test]
    fn zero_not_before_sorts_before_nonzero_within_same_reason() {
        let immediate = op(Reason::Retry, "a");
        let mut delayed = op(Reason::Retry, "a");
        delayed.not_before = Some(Utc::now() + chrono::Duration::hours(1));
        assert!(immediate < delayed);
    }

    #[test]
    fn rollout_hash_breaks_ties_among_synthesizer_modified() {
        let mut a = op(Reason::SynthesizerModified, "a");
        let mut b = op(Reason::SynthesizerModified, "b");
        a.rollout_hash = Some(1);
        b.rollout_hash = Some(2);
        assert!(a < b);
    }

    #[test]
    fn composition_uid_is_the_final_tiebreak() {
        let a = op(Reason::Initial, "a");
        let b = op(Reason::Initial, "b");
        assert!(a < b);
        assert_ne!(a.cmp(&b), std::cmp::Ordering::Equal);
    }

    #[test]
    fn rollout_key_is_deterministic_and_uid_sensitive() {
        let synth = Uid::from("synth-1");
        let c1 = Uid::from("c1");
        let c2 = Uid::from("c2");
        let gen1 = Generation(1);
        let gen2 = Generation(2);
        assert_eq!(rollout_key(&synth, gen1, &c1), rollout_key(&synth, gen1, &c1));
        assert_ne!(rollout_key(&synth, gen1, &c1), rollout_key(&synth, gen1, &c2));
        assert_ne!(rollout_key(&synth, gen1, &c1), rollout_key(&synth, gen2, &c1));
    }
}
