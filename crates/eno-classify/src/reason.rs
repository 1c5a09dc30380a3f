// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The operation reason and its rank.

/// Why an operation was produced. Variant declaration order *is* the rank:
/// `Initial < ForcedResynthesis < CompositionModified < InputModified <
/// DeferredInputModified < SynthesizerModified < Retry` — the derived
/// [`Ord`] relies on this exact order, so reordering these variants changes
/// scheduling behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reason {
    /// No current and no in-flight synthesis exists yet (rule R1).
    Initial,
    /// `forceResynthesis` annotation references the latest synthesis UUID (R2).
    ForcedResynthesis,
    /// The active slot's observed composition generation is stale (R3).
    CompositionModified,
    /// A non-deferred input revision moved (R4).
    InputModified,
    /// A deferred input revision moved; subject to the cooldown (R5).
    DeferredInputModified,
    /// The synthesizer was upgraded; subject to the cooldown (R6).
    SynthesizerModified,
    /// A canceled in-flight synthesis is retried with backoff (R7).
    Retry,
}

impl Reason {
    /// True for the two reasons subject to the cluster-wide deferred cooldown.
    #[must_use]
    pub const fn is_deferred(self) -> bool {
        matches!(self, Self::DeferredInputModified | Self::SynthesizerModified)
    }
}
