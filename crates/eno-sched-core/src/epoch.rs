// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The synthesizer-set epoch fingerprint, used for two-phase synthesizer
//! rollouts.

use std::hash::{Hash, Hasher};

use eno_types::Synthesizer;
use fnv::FnvHasher;

/// A fingerprint of the full synthesizer set, independent of listing order.
///
/// Changes iff any synthesizer is added, removed, or has its `(uid,
/// generation)` pair bumped — the dispatch loop writes this onto a
/// composition ahead of a `SynthesizerModified` dispatch so the
/// composition-informer is forced to re-deliver the composition after the
/// synthesizer change lands, closing the ordering gap between the two
/// independent informer streams.
///
/// Synthesizers are sorted by name before hashing so two listings of the
/// same set in different orders (as any unsorted apiserver `List` may
/// return) fold to the same epoch.
#[must_use]
pub fn epoch_hash(synthesizers: &[Synthesizer]) -> u64 {
    let mut sorted: Vec<&Synthesizer> = synthesizers.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut hasher = FnvHasher::default();
    for synthesizer in sorted {
        synthesizer.uid.0.hash(&mut hasher);
        synthesizer.generation.0.hash(&mut hasher);
    }
    hasher.finish()
}
