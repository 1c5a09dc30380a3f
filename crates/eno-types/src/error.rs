// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Programmer-bug detection: negative generations, invariant breaks.

use thiserror::Error;

/// A detected violation of one of the data-model invariants.
///
/// These never arise from normal cluster churn — they indicate a bug in this
/// codebase or a collaborator writing state outside its documented contract.
/// The dispatch loop fails the tick and increments a metric rather than
/// panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// More than one of the three synthesis slots is unfinished.
    #[error("more than one synthesis slot is unfinished")]
    MultipleInFlight,
    /// A generation field read a negative value.
    #[error("generation must be non-negative")]
    NegativeGeneration,
}
