//! Per-phase artifact bookkeeping

use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type ArtifactMap = BTreeMap<String, Value>;

/// Values recorded by steps, keyed by the phase that produced them.
///
/// Every phase starts with an empty map. Writes are last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactStore {
    by_phase: BTreeMap<Phase, ArtifactMap>,
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self {
            by_phase: Phase::ALL
                .into_iter()
                .map(|phase| (phase, ArtifactMap::new()))
                .collect(),
        }
    }
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` under `(phase, name)`. Dropped when no phase is active.
    pub fn push(&mut self, phase: Option<Phase>, name: impl Into<String>, value: impl Into<Value>) {
        let Some(phase) = phase else {
            return;
        };
        self.by_phase
            .entry(phase)
            .or_default()
            .insert(name.into(), value.into());
    }

    pub fn get(&self, phase: Phase, name: &str) -> Option<&Value> {
        self.by_phase.get(&phase).and_then(|artifacts| artifacts.get(name))
    }

    /// Everything recorded during `phase`
    pub fn phase(&self, phase: Phase) -> &ArtifactMap {
        static EMPTY: ArtifactMap = ArtifactMap::new();
        self.by_phase.get(&phase).unwrap_or(&EMPTY)
    }

    pub fn all(&self) -> &BTreeMap<Phase, ArtifactMap> {
        &self.by_phase
    }

    pub fn is_empty(&self) -> bool {
        self.by_phase.values().all(ArtifactMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_phase_starts_empty() {
        let store = ArtifactStore::new();
        assert_eq!(store.all().len(), 5);
        assert!(store.is_empty());
        for phase in Phase::ALL {
            assert!(store.phase(phase).is_empty());
        }
    }

    #[test]
    fn test_push_and_get() {
        let mut store = ArtifactStore::new();
        store.push(Some(Phase::Build), "artifact1", "value1");
        assert_eq!(store.get(Phase::Build, "artifact1"), Some(&json!("value1")));
        assert_eq!(store.get(Phase::Setup, "artifact1"), None);
    }

    #[test]
    fn test_push_without_phase_is_dropped() {
        let mut store = ArtifactStore::new();
        store.push(None, "orphan", "value");
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = ArtifactStore::new();
        store.push(Some(Phase::Build), "gem", "pkg/a.gem");
        store.push(Some(Phase::Build), "gem", "pkg/b.gem");
        assert_eq!(store.get(Phase::Build, "gem"), Some(&json!("pkg/b.gem")));
        assert_eq!(store.phase(Phase::Build).len(), 1);
    }

    #[test]
    fn test_unwritten_is_absent_not_default() {
        let store = ArtifactStore::new();
        assert!(store.get(Phase::AfterBuild, "checksum").is_none());
    }
}
