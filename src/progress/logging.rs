//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PipelineStarted { pipeline } => {
                info!(pipeline = %pipeline, "Starting pipeline");
            }
            ProgressEvent::PhaseStarted { phase, steps } => {
                debug!(phase = %phase, steps, "Starting phase");
            }
            ProgressEvent::PhaseComplete { phase, duration } => {
                info!(
                    phase = %phase,
                    duration_ms = duration.as_millis(),
                    "Phase complete"
                );
            }
            ProgressEvent::StepFailed { phase, step, error } => {
                warn!(phase = %phase, step = %step, error = %error, "Step failed");
            }
            ProgressEvent::Completed { total_time } => {
                info!(total_time_ms = total_time.as_millis(), "Pipeline complete");
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Pipeline failed");
            }
        }
    }
}
