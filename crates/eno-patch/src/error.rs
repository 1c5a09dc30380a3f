// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors raised while building a patch.

use thiserror::Error;

/// Failure while constructing a [`crate::Patch`].
#[derive(Debug, Error)]
pub enum PatchBuildError {
    /// A field destined for the patch failed to serialize to JSON.
    #[error("failed to serialize patch value: {0}")]
    Serialize(#[from] serde_json::Error),
}
