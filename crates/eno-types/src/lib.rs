// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core data model for the Eno scheduling core.
//!
//! This crate holds the shapes the classifier, priority ordering, and patch
//! builder read and write — [`Synthesizer`], [`Composition`], and
//! [`Synthesis`] — plus the invariants that every successful status patch
//! must preserve. It deliberately carries no I/O and no async
//! dependency: everything here is a plain, `Clone`-able value type so the
//! scheduling core's pure components can be unit-tested without a cluster.

mod error;
mod ids;
mod input_revision;
mod ref_def;
mod synthesis;

pub mod composition;
pub mod synthesizer;

pub use error::InvariantViolation;
pub use ids::{Generation, Uid};
pub use input_revision::InputRevision;
pub use ref_def::RefDef;
pub use synthesis::{Synthesis, SynthesisSlot, SynthesisUuid};

pub use composition::{Binding, Composition, CompositionStatus};
pub use synthesizer::Synthesizer;
