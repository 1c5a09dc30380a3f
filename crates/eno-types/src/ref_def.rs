// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Synthesizer ref schema entries.

use serde::{Deserialize, Serialize};

/// A declared input slot on a [`crate::Synthesizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefDef {
    /// The binding key this ref is addressed by.
    pub key: String,
    /// When true, changes to the bound input are subject to the cluster-wide
    /// cooldown instead of dispatching immediately.
    pub defer: bool,
}

impl RefDef {
    /// Construct a non-deferred ref.
    #[must_use]
    pub fn eager(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            defer: false,
        }
    }

    /// Construct a deferred ref.
    #[must_use]
    pub fn deferred(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            defer: true,
        }
    }
}
