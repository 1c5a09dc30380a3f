// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! An in-memory [`ClusterStore`], sufficient to drive the dispatch loop and
//! its tests without a real apiserver.

use std::collections::HashMap;

use eno_patch::{Patch, PatchOp};
use eno_types::{Composition, CompositionStatus, Generation, Synthesis, SynthesisUuid, Synthesizer, Uid};
use tokio::sync::Mutex;

use crate::{ClusterError, ClusterStore};

/// A `Send + Sync` reference cluster, keyed by object UID.
///
/// Patches are applied all-or-nothing: every `test` op is checked against a
/// snapshot before any write lands, so a failing precondition never leaves
/// the composition half-updated.
#[derive(Default)]
pub struct InMemoryClusterStore {
    compositions: Mutex<HashMap<Uid, Composition>>,
    synthesizers: Mutex<HashMap<Uid, Synthesizer>>,
}

impl InMemoryClusterStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with initial cluster state, e.g. from a test fixture.
    #[must_use]
    pub fn seeded(compositions: Vec<Composition>, synthesizers: Vec<Synthesizer>) -> Self {
        Self {
            compositions: Mutex::new(compositions.into_iter().map(|c| (c.uid.clone(), c)).collect()),
            synthesizers: Mutex::new(synthesizers.into_iter().map(|s| (s.uid.clone(), s)).collect()),
        }
    }
}

impl ClusterStore for InMemoryClusterStore {
    async fn list_synthesizers(&self) -> Result<Vec<Synthesizer>, ClusterError> {
        Ok(self.synthesizers.lock().await.values().cloned().collect())
    }

    async fn list_compositions(&self) -> Result<Vec<Composition>, ClusterError> {
        Ok(self.compositions.lock().await.values().cloned().collect())
    }

    async fn get_composition(&self, uid: &Uid) -> Result<Option<Composition>, ClusterError> {
        Ok(self.compositions.lock().await.get(uid).cloned())
    }

    async fn apply_patch(&self, uid: &Uid, patch: &Patch) -> Result<(), ClusterError> {
        let mut compositions = self.compositions.lock().await;
        let composition = compositions
            .get(uid)
            .ok_or_else(|| ClusterError::NotFound(uid.to_string()))?;

        for op in patch.ops() {
            check_test_op(composition, op)?;
        }

        let mut updated = composition.clone();
        for op in patch.ops() {
            apply_write_op(&mut updated, op)?;
        }
        compositions.insert(uid.clone(), updated);
        Ok(())
    }

    async fn set_synth_epoch_annotation(&self, uid: &Uid, epoch: u64) -> Result<(), ClusterError> {
        let mut compositions = self.compositions.lock().await;
        let composition = compositions.get_mut(uid).ok_or_else(|| ClusterError::NotFound(uid.to_string()))?;
        composition.synth_epoch = Some(epoch);
        Ok(())
    }
}

fn check_test_op(composition: &Composition, op: &PatchOp) -> Result<(), ClusterError> {
    let PatchOp::Test { path, value } = op else {
        return Ok(());
    };
    let actual = match path.as_str() {
        "/status" => {
            if composition.status == CompositionStatus::default() {
                serde_json::Value::Null
            } else {
                serde_json::Value::Bool(true)
            }
        }
        "/status/inputRevisions" => serde_json::to_value(&composition.status.input_revisions)
            .map_err(|e| ClusterError::Invalid(e.to_string()))?,
        "/status/inFlightSynthesis" => match &composition.status.in_flight_synthesis {
            None => serde_json::Value::Null,
            Some(_) => serde_json::Value::Bool(true),
        },
        "/status/inFlightSynthesis/uuid" => field_of_in_flight(composition, |s| {
            serde_json::to_value(s.uuid)
        })?,
        "/status/inFlightSynthesis/observedCompositionGeneration" => field_of_in_flight(composition, |s| {
            serde_json::to_value(s.observed_composition_generation)
        })?,
        "/status/inFlightSynthesis/synthesized" => field_of_in_flight(composition, |s| {
            serde_json::to_value(s.synthesized)
        })?,
        "/status/currentSynthesis" => match &composition.status.current_synthesis {
            None => serde_json::Value::Null,
            Some(_) => serde_json::Value::Bool(true),
        },
        "/status/currentSynthesis/observedCompositionGeneration" => field_of_current(composition, |s| {
            serde_json::to_value(s.observed_composition_generation)
        })?,
        "/status/currentSynthesis/observedSynthesizerGeneration" => field_of_current(composition, |s| {
            serde_json::to_value(s.observed_synthesizer_generation)
        })?,
        "/status/currentSynthesis/inputRevisions" => field_of_current(composition, |s| {
            serde_json::to_value(&s.input_revisions)
        })?,
        other => return Err(ClusterError::Invalid(format!("unsupported patch path: {other}"))),
    };
    if &actual == value {
        Ok(())
    } else {
        Err(ClusterError::Invalid(format!("precondition failed at {path}")))
    }
}

fn field_of_in_flight(
    composition: &Composition,
    f: impl FnOnce(&Synthesis) -> Result<serde_json::Value, serde_json::Error>,
) -> Result<serde_json::Value, ClusterError> {
    match &composition.status.in_flight_synthesis {
        None => Ok(serde_json::Value::Null),
        Some(s) => f(s).map_err(|e| ClusterError::Invalid(e.to_string())),
    }
}

fn field_of_current(
    composition: &Composition,
    f: impl FnOnce(&Synthesis) -> Result<serde_json::Value, serde_json::Error>,
) -> Result<serde_json::Value, ClusterError> {
    match &composition.status.current_synthesis {
        None => Ok(serde_json::Value::Null),
        Some(s) => f(s).map_err(|e| ClusterError::Invalid(e.to_string())),
    }
}

fn apply_write_op(composition: &mut Composition, op: &PatchOp) -> Result<(), ClusterError> {
    match op {
        PatchOp::Test { .. } => Ok(()),
        PatchOp::Add { path, .. } if path == "/status" => Ok(()),
        PatchOp::Replace { path, value } if path == "/status/inFlightSynthesis" => {
            composition.status.in_flight_synthesis = Some(synthesis_from_replacement(value)?);
            Ok(())
        }
        PatchOp::Add { path, .. } | PatchOp::Replace { path, .. } => {
            Err(ClusterError::Invalid(format!("unsupported patch path: {path}")))
        }
    }
}

fn synthesis_from_replacement(value: &serde_json::Value) -> Result<Synthesis, ClusterError> {
    let invalid = |e: serde_json::Error| ClusterError::Invalid(e.to_string());
    let uuid: SynthesisUuid = serde_json::from_value(value["uuid"].clone()).map_err(invalid)?;
    let observed_composition_generation: Generation =
        serde_json::from_value(value["observedCompositionGeneration"].clone()).map_err(invalid)?;
    let observed_synthesizer_generation: Generation =
        serde_json::from_value(value["observedSynthesizerGeneration"].clone()).map_err(invalid)?;
    let initialized = serde_json::from_value(value["initialized"].clone()).map_err(invalid)?;
    let deferred: bool = serde_json::from_value(value["deferred"].clone()).map_err(invalid)?;
    let attempts: u32 = serde_json::from_value(value["attempts"].clone()).map_err(invalid)?;
    Ok(Synthesis {
        uuid,
        observed_composition_generation,
        observed_synthesizer_generation,
        initialized,
        synthesized: None,
        reconciled: None,
        ready: None,
        canceled: None,
        attempts,
        deferred,
        input_revisions: vec![],
    })
}
