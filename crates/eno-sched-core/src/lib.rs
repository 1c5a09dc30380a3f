// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The scheduling core: the dispatch loop and its supporting clock,
//! cooldown, cache-consistency, watchdog, and epoch-fingerprint modules.
//!
//! Everything in this crate is impure — it reads the cluster through
//! [`eno_cluster_port::ClusterStore`] and time through [`clock::Clock`] — by
//! design: the pure decision logic lives in `eno-classify` and `eno-patch`,
//! and this crate's only job is sequencing calls into them against live
//! state.

pub mod clock;
pub mod cooldown;
pub mod dispatch;
pub mod epoch;
pub mod gate;
pub mod metrics;
pub mod watchdog;

pub use dispatch::{DispatchError, Scheduler, TickOutcome};
