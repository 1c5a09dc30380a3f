// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pure classification and ordering of scheduling operations.
//!
//! This crate has no I/O, no clock access, and no async runtime dependency —
//! [`classify`] and the [`Operation`] total order are plain functions of
//! their inputs, so the dispatch loop (`eno-sched-core`) can call them
//! repeatedly against a fresh cluster snapshot without side effects, and so
//! they can be fuzzed and property-tested in isolation.

mod backoff;
mod operation;
mod reason;
mod rules;

pub use backoff::retry_not_before;
pub use operation::{rollout_key, Operation};
pub use reason::Reason;
pub use rules::classify;
