//! Configuration templates
//!
//! A [`Template`] is the prototype a pipeline type hands to every instance:
//! step lists per phase, flag defaults and requirements, the capability
//! inclusion policy, log settings, and an empty artifact store.
//!
//! Cloning a template is the deep copy used both when a type is derived
//! and when an instance is constructed. Collections are copied; step
//! closures are immutable and shared behind `Arc`.

use crate::artifacts::ArtifactStore;
use crate::capability::CapabilityPolicy;
use crate::error::Result;
use crate::flags::FlagSet;
use crate::logger::LogSettings;
use crate::phase::Phase;
use crate::pipeline::StepContext;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type StepFn = dyn Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync;

/// A unit of caller-supplied logic registered into a phase
#[derive(Clone)]
pub struct Step {
    label: Option<String>,
    action: Arc<StepFn>,
}

impl Step {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            label: None,
            action: Arc::new(action),
        }
    }

    /// A step with a label used in diagnostics and progress events
    pub fn named<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            label: Some(label.into()),
            action: Arc::new(action),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        (self.action)(ctx)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("label", &self.label).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    steps: BTreeMap<Phase, Vec<Step>>,
    pub flags: FlagSet,
    pub capability_policy: CapabilityPolicy,
    pub log_settings: LogSettings,
    pub artifacts: ArtifactStore,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            steps: Phase::ALL.into_iter().map(|phase| (phase, Vec::new())).collect(),
            flags: FlagSet::default(),
            capability_policy: CapabilityPolicy::default(),
            log_settings: LogSettings::default(),
            artifacts: ArtifactStore::default(),
        }
    }
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self, phase: Phase) -> &[Step] {
        self.steps.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn step_count(&self) -> usize {
        self.steps.values().map(Vec::len).sum()
    }

    pub fn append(&mut self, phase: Phase, step: Step) {
        self.steps.entry(phase).or_default().push(step);
    }

    pub fn prepend(&mut self, phase: Phase, step: Step) {
        self.steps.entry(phase).or_default().insert(0, step);
    }
}
