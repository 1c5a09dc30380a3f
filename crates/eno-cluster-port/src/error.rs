// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors a [`crate::ClusterStore`] implementation can surface.

use thiserror::Error;

/// Failure talking to the cluster apiserver.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A `test` precondition in the submitted patch did not hold — the
    /// apiserver's `Invalid` response. Another writer raced the caller; the
    /// dispatch loop re-evaluates on the next tick rather than retrying
    /// this exact patch.
    #[error("patch precondition failed: {0}")]
    Invalid(String),
    /// The referenced object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
    /// A transient failure (timeout, 5xx, connection reset). The framework
    /// retries with backoff; this is never fatal to the process.
    #[error("transient apiserver error: {0}")]
    Transient(String),
}
