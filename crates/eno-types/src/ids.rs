// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity newtypes shared by [`crate::Synthesizer`] and [`crate::Composition`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Kubernetes object UID. Assigned once at object creation and stable for
/// the object's lifetime — distinct from [`crate::SynthesisUuid`], which is
/// minted fresh on every dispatch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(pub String);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A monotonic object generation, bumped by spec edits.
///
/// Kubernetes generations are non-negative `int64`s; a negative value can
/// only arise from a programmer bug (a malformed fixture, a bad deserialize
/// path) and is treated as such by [`Generation::checked`] rather than
/// silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub i64);

impl Generation {
    /// Generation zero — used for synthesizers/observed-generations that
    /// have never been set.
    pub const ZERO: Self = Self(0);

    /// Returns `self` if non-negative, otherwise `None`.
    #[must_use]
    pub fn checked(self) -> Option<Self> {
        (self.0 >= 0).then_some(self)
    }

    /// True when this generation has never been observed (is zero).
    #[must_use]
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_rejects_negative() {
        assert_eq!(Generation(-1).checked(), None);
        assert_eq!(Generation(0).checked(), Some(Generation(0)));
        assert_eq!(Generation(4).checked(), Some(Generation(4)));
    }

    #[test]
    fn is_unset_only_at_zero() {
        assert!(Generation::ZERO.is_unset());
        assert!(!Generation(1).is_unset());
    }
}
