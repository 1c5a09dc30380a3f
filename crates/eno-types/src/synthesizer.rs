// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The cluster-scoped Synthesizer definition.

use serde::{Deserialize, Serialize};

use crate::{Generation, RefDef, Uid};

/// A cluster-scoped synthesizer definition: an opaque image reference, a
/// command, timeout envelopes, and a schema of refs.
///
/// Only the fields the scheduling core actually reads are modeled here —
/// image/command/timeouts belong to the synthesizer-pod collaborator and
/// are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesizer {
    /// Cluster object UID.
    pub uid: Uid,
    /// Cluster-scoped name.
    pub name: String,
    /// Monotonically increasing generation, bumped by spec edits.
    pub generation: Generation,
    /// Declared ref schema.
    pub refs: Vec<RefDef>,
}

impl Synthesizer {
    /// Look up a declared ref by key.
    #[must_use]
    pub fn ref_by_key(&self, key: &str) -> Option<&RefDef> {
        self.refs.iter().find(|r| r.key == key)
    }

    /// True when every declared ref has a matching key in `keys`.
    #[must_use]
    pub fn refs_satisfied_by<'a>(&self, mut keys: impl Iterator<Item = &'a str> + Clone) -> bool {
        self.refs
            .iter()
            .all(|r| keys.clone().any(|k| k == r.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(refs: Vec<RefDef>) -> Synthesizer {
        Synthesizer {
            uid: Uid::from("synth-uid"),
            name: "s1".into(),
            generation: Generation(1),
            refs,
        }
    }

    #[test]
    fn refs_satisfied_requires_every_ref_present() {
        let s = synth(vec![RefDef::eager("a"), RefDef::deferred("b")]);
        assert!(s.refs_satisfied_by(vec!["a", "b", "c"].into_iter()));
        assert!(!s.refs_satisfied_by(vec!["a"].into_iter()));
    }

    #[test]
    fn ref_by_key_finds_declared_ref() {
        let s = synth(vec![RefDef::eager("a")]);
        assert_eq!(s.ref_by_key("a").map(|r| r.defer), Some(false));
        assert!(s.ref_by_key("missing").is_none());
    }
}
