// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! RFC 6902 JSON-Patch operations, the wire format the dispatch loop sends
//! to the apiserver.
//!
//! This is a hand-rolled, intentionally narrow representation — only the
//! three op kinds the patch builder ever emits — rather than a dependency on
//! a general JSON-Patch crate, so the shape stays exactly what the builder
//! needs and nothing more.

use serde::Serialize;

/// One entry of a JSON-Patch document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Precondition: the value at `path` must equal `value`, or the
    /// apiserver rejects the whole patch as `Invalid`.
    Test {
        /// JSON Pointer into the object.
        path: String,
        /// Value the pointer must currently hold.
        value: serde_json::Value,
    },
    /// Set `path` to `value`, which must not already exist.
    Add {
        /// JSON Pointer into the object.
        path: String,
        /// Value to set.
        value: serde_json::Value,
    },
    /// Set `path` to `value`, which must already exist.
    Replace {
        /// JSON Pointer into the object.
        path: String,
        /// Value to set.
        value: serde_json::Value,
    },
}

impl PatchOp {
    /// Build a `test` operation.
    #[must_use]
    pub fn test(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::Test { path: path.into(), value }
    }

    /// Build an `add` operation.
    #[must_use]
    pub fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::Add { path: path.into(), value }
    }

    /// Build a `replace` operation.
    #[must_use]
    pub fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::Replace { path: path.into(), value }
    }
}

/// An ordered sequence of [`PatchOp`]s to submit as a single apiserver
/// JSON-Patch request. Order matters: preconditions must precede the writes
/// they guard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    #[must_use]
    pub(crate) const fn new(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }

    /// Borrow the operations in submission order.
    #[must_use]
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Consume `self`, returning the operations in submission order.
    #[must_use]
    pub fn into_ops(self) -> Vec<PatchOp> {
        self.ops
    }

    /// The synthesis UUID minted into this patch's `inFlightSynthesis`
    /// replacement, if any.
    ///
    /// The dispatch loop (`eno-sched-core`) reads this back out to memoize
    /// the dispatch for the cache-consistency gate — the UUID is otherwise
    /// only ever embedded in the JSON-Patch wire payload, never returned
    /// separately by [`crate::build_patch`].
    #[must_use]
    pub fn minted_uuid(&self) -> Option<eno_types::SynthesisUuid> {
        self.ops.iter().find_map(|op| match op {
            PatchOp::Replace { path, value } if path == "/status/inFlightSynthesis" => {
                serde_json::from_value(value.get("uuid")?.clone()).ok()
            }
            _ => None,
        })
    }
}
