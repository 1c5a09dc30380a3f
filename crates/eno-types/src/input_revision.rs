// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-binding input revision snapshots and their change-detection rules.

use crate::Generation;
use serde::{Deserialize, Serialize};

/// A snapshot of one bound input's version, as written by the input-watch
/// collaborator and read by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRevision {
    /// The binding key this snapshot belongs to.
    pub key: String,
    /// The input object's `resourceVersion` at observation time.
    ///
    /// Kubernetes resource versions are opaque strings in general, but the
    /// input watcher is expected to preserve the apiserver's numeric ones;
    /// see [`InputRevision::is_older_than`] for the fallback when it can't be
    /// parsed as a number.
    pub resource_version: Option<String>,
    /// A cross-input revision number. When multiple inputs are revisioned
    /// together (e.g. from the same upstream commit), they converge to the
    /// same value; a mismatch here is an "out-of-lockstep" input set.
    pub revision: Option<i64>,
    /// The synthesizer generation this input was bound under, if known.
    pub synthesizer_generation: Option<Generation>,
    /// Per-input opt-out of change detection. `Some(true)` suppresses
    /// dispatch for this input unless the other side of the comparison
    /// explicitly sets `Some(false)`.
    pub ignore_side_effects: Option<bool>,
}

impl InputRevision {
    /// Construct a bare revision snapshot with no optional fields set.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            resource_version: None,
            revision: None,
            synthesizer_generation: None,
            ignore_side_effects: None,
        }
    }

    /// The numeric resource version, if `resource_version` parses as one.
    #[must_use]
    pub fn numeric_resource_version(&self) -> Option<u64> {
        self.resource_version.as_deref().and_then(|rv| rv.parse().ok())
    }

    /// True when `self` (captured in an active synthesis slot) is strictly
    /// older than `latest` (the current `status.inputRevisions` entry for the
    /// same key), i.e. the input has changed since `self` was observed.
    ///
    /// Comparison order:
    /// 1. If both carry a numeric `revision`, compare that.
    /// 2. Otherwise compare `resource_version` numerically; a side that fails
    ///    to parse is treated as a forced mismatch (never panics, never
    ///    silently treats the pair as equal).
    ///
    /// The `ignore_side_effects` opt-out is applied by
    /// [`InputRevision::change_is_suppressed`], not here — this method
    /// answers only "did the version move", independent of suppression.
    #[must_use]
    pub fn is_older_than(&self, latest: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.revision, latest.revision) {
            return a < b;
        }
        match (self.numeric_resource_version(), latest.numeric_resource_version()) {
            (Some(a), Some(b)) => a < b,
            _ => self.resource_version != latest.resource_version,
        }
    }

    /// True when the change from `self` to `latest` should be suppressed by
    /// the `ignoreSideEffects` opt-out.
    ///
    /// Either side setting `ignore_side_effects = Some(true)` suppresses
    /// change detection for this pair, *unless* the other side explicitly
    /// sets `Some(false)` — an explicit opt-in overrides an opt-out, so a
    /// consumer can force re-synthesis on one input even when the
    /// composition as a whole has opted out of side effects.
    #[must_use]
    pub fn change_is_suppressed(&self, latest: &Self) -> bool {
        let self_opts_out = self.ignore_side_effects == Some(true);
        let latest_opts_out = latest.ignore_side_effects == Some(true);
        let self_opts_in = self.ignore_side_effects == Some(false);
        let latest_opts_in = latest.ignore_side_effects == Some(false);
        (self_opts_out || latest_opts_out) && !(self_opts_in || latest_opts_in)
    }

    /// True when two revisions of different keys disagree on their cross-input
    /// `revision` and are therefore "out of lockstep".
    #[must_use]
    pub fn conflicts_on_revision(&self, other: &Self) -> bool {
        match (self.revision, other.revision) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }
}
