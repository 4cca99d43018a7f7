//! Progress handler trait and events

use crate::phase::Phase;
use std::time::Duration;

/// Events emitted while a pipeline runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// `run()` started
    PipelineStarted { pipeline: String },

    /// A phase is about to execute its steps
    PhaseStarted { phase: Phase, steps: usize },

    /// Every step of the phase succeeded
    PhaseComplete { phase: Phase, duration: Duration },

    /// A step returned a failure; the run stops here
    StepFailed {
        phase: Phase,
        step: String,
        error: String,
    },

    /// All five phases succeeded
    Completed { total_time: Duration },

    /// The run aborted
    Failed { error: String },
}

/// Trait for observing pipeline runs
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
