// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The cluster apiserver port.
//!
//! [`ClusterStore`] is the only boundary between the scheduling core
//! (`eno-sched-core`) and the Kubernetes apiserver. Phase 1 ships
//! [`memory::InMemoryClusterStore`] — enough to drive the dispatch loop and
//! its tests without a real cluster. A `kube`-backed implementation talking
//! to a live apiserver is future work; nothing in `eno-sched-core` assumes
//! which one is wired in.

mod error;
mod memory;

pub use error::ClusterError;
pub use memory::InMemoryClusterStore;

use std::future::Future;

use eno_patch::Patch;
use eno_types::{Composition, Synthesizer, Uid};

/// Read/write access to the subset of cluster state the scheduling core
/// needs: synthesizers, compositions, and JSON-Patch writes to a
/// composition's `/status`.
///
/// Every method is read-only or a single optimistic write — there is no
/// transaction spanning multiple compositions — the composition is the
/// only mutable shared resource.
pub trait ClusterStore: Send + Sync {
    /// List every synthesizer in the cluster, in no particular order — the
    /// caller is responsible for sorting.
    fn list_synthesizers(&self) -> impl Future<Output = Result<Vec<Synthesizer>, ClusterError>> + Send;

    /// List every composition in the cluster, in no particular order.
    fn list_compositions(&self) -> impl Future<Output = Result<Vec<Composition>, ClusterError>> + Send;

    /// Fetch a single composition by UID, for the cache-consistency gate's
    /// re-read.
    fn get_composition(&self, uid: &Uid) -> impl Future<Output = Result<Option<Composition>, ClusterError>> + Send;

    /// Apply a JSON-Patch to a composition's `/status`. Fails with
    /// [`ClusterError::Invalid`] if any `test` precondition does not hold —
    /// the apiserver-side signal that a concurrent writer raced the caller.
    fn apply_patch(&self, uid: &Uid, patch: &Patch) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// Set the synth-epoch annotation on a composition, ahead of a
    /// `SynthesizerModified` dispatch (the synth-epoch two-phase write).
    fn set_synth_epoch_annotation(&self, uid: &Uid, epoch: u64) -> impl Future<Output = Result<(), ClusterError>> + Send;
}
