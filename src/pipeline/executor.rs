//! Phase execution
//!
//! `run` drives `setup → before_build → build → after_build → teardown`.
//! The three build-scoped phases run inside the `build_root` flag's
//! directory when it is set. The first failing step aborts the run: no
//! later phase executes, `teardown` included.

use super::Pipeline;
use crate::config::BUILD_ROOT_FLAG;
use crate::error::{PipelineError, Result};
use crate::logger::Severity;
use crate::phase::Phase;
use crate::progress::ProgressEvent;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

impl Pipeline {
    /// Runs all five phases in order
    pub fn run(&mut self) -> Result<()> {
        let start = Instant::now();
        info!(pipeline = %self.type_name, "Starting pipeline run");
        self.emit(ProgressEvent::PipelineStarted {
            pipeline: self.type_name.clone(),
        });

        match self.run_phases() {
            Ok(()) => {
                info!(
                    pipeline = %self.type_name,
                    duration_ms = start.elapsed().as_millis(),
                    "Pipeline run complete"
                );
                self.emit(ProgressEvent::Completed {
                    total_time: start.elapsed(),
                });
                Ok(())
            }
            Err(err) => {
                self.emit(ProgressEvent::Failed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn run_phases(&mut self) -> Result<()> {
        self.run_phase(Phase::Setup)?;

        let build_root = self.flag_str(BUILD_ROOT_FLAG);
        let guard = match build_root {
            Some(root) => {
                Some(WorkingDirGuard::enter(Path::new(&root)).map_err(|err| self.raise(err))?)
            }
            None => None,
        };

        for phase in Phase::ALL.into_iter().filter(|p| p.is_build_scoped()) {
            self.run_phase(phase)?;
        }

        if let Some(guard) = guard {
            guard.restore().map_err(|err| self.raise(err))?;
        }

        self.run_phase(Phase::Teardown)
    }

    /// Runs the steps registered for `phase`, in order.
    ///
    /// The step list is snapshotted first: steps added to this phase while
    /// it runs apply to its next execution. On failure the current-phase
    /// marker is left pointing at the failed phase.
    pub fn run_phase(&mut self, phase: Phase) -> Result<()> {
        let steps = self.config.steps(phase).to_vec();
        let phase_start = Instant::now();

        debug!(pipeline = %self.type_name, phase = %phase, steps = steps.len(), "Phase");
        self.emit(ProgressEvent::PhaseStarted {
            phase,
            steps: steps.len(),
        });

        self.current_phase = Some(phase);
        for (index, step) in steps.iter().enumerate() {
            self.in_step = true;
            let outcome = step.run(&mut self.scoped(Some(phase)));
            self.in_step = false;

            if let Err(err) = outcome {
                let step_name = step
                    .label()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}#{}", phase, index));

                self.log(Severity::Fatal, &err.to_string());
                debug!(pipeline = %self.type_name, phase = %phase, step = %step_name, "Step failed");

                self.emit(ProgressEvent::StepFailed {
                    phase,
                    step: step_name,
                    error: err.to_string(),
                });
                return Err(err);
            }
        }
        self.current_phase = None;

        self.emit(ProgressEvent::PhaseComplete {
            phase,
            duration: phase_start.elapsed(),
        });
        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress {
            handler.on_progress(&event);
        }
    }
}

/// Changes the process working directory and changes it back on
/// [`restore`](Self::restore) or drop.
struct WorkingDirGuard {
    original: Option<PathBuf>,
}

impl WorkingDirGuard {
    fn enter(target: &Path) -> Result<Self> {
        let original = env::current_dir().map_err(|source| PipelineError::WorkingDirectory {
            path: PathBuf::from("."),
            source,
        })?;
        env::set_current_dir(target).map_err(|source| PipelineError::WorkingDirectory {
            path: target.to_path_buf(),
            source,
        })?;

        debug!(from = %original.display(), to = %target.display(), "Entered build root");
        Ok(Self {
            original: Some(original),
        })
    }

    fn restore(mut self) -> Result<()> {
        match self.original.take() {
            Some(original) => {
                env::set_current_dir(&original).map_err(|source| {
                    PipelineError::WorkingDirectory {
                        path: original.clone(),
                        source,
                    }
                })
            }
            None => Ok(()),
        }
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            if let Err(err) = env::set_current_dir(&original) {
                warn!(
                    path = %original.display(),
                    error = %err,
                    "Failed to restore working directory"
                );
            }
        }
    }
}
