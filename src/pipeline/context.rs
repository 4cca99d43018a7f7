use super::Pipeline;
use crate::error::Result;
use crate::phase::Phase;
use serde_json::Value;
use std::ops::{Deref, DerefMut};

/// Handle given to every step and instance operation.
///
/// Carries the phase being executed, so artifact writes are attributed
/// without consulting mutable pipeline state. Dereferences to the
/// [`Pipeline`] for flags, logging, artifact reads and step insertion.
pub struct StepContext<'a> {
    pipeline: &'a mut Pipeline,
    phase: Option<Phase>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(pipeline: &'a mut Pipeline, phase: Option<Phase>) -> Self {
        Self { pipeline, phase }
    }

    /// The phase this step runs in; `None` outside a run
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Records `value` under `(phase, name)`, replacing any earlier value.
    /// Does nothing when no phase is active.
    pub fn push_artifact(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.pipeline.config.artifacts.push(self.phase, name, value);
    }

    /// Invokes an instance operation contributed by an attached capability
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let op = self.pipeline.instance_operation(name)?;
        op(self, args)
    }
}

impl Deref for StepContext<'_> {
    type Target = Pipeline;

    fn deref(&self) -> &Pipeline {
        self.pipeline
    }
}

impl DerefMut for StepContext<'_> {
    fn deref_mut(&mut self) -> &mut Pipeline {
        self.pipeline
    }
}
