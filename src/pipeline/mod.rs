//! Pipeline instances
//!
//! A [`Pipeline`] is built from a [`PipelineType`]: it copies the type's
//! template, resolves flags, settles its log settings and validates the
//! required flags. [`Pipeline::run`] then drives the five phases in order
//! (see `executor`).
//!
//! Steps receive a [`StepContext`] that knows the active phase and
//! dereferences to the pipeline for everything else.

mod context;
mod executor;
mod options;

pub use context::StepContext;
pub use options::PipelineOptions;

use crate::artifacts::ArtifactMap;
use crate::capability::InstanceOperation;
use crate::config::{EnvOverrides, LOG_LEVEL_FLAG, LOG_SINK_FLAG};
use crate::error::{PipelineError, Result};
use crate::flags::{self, value_to_string, FlagMap};
use crate::logger::{progname_for, LogSettings, LogSink, Logger, Severity};
use crate::phase::Phase;
use crate::pipeline_type::PipelineType;
use crate::progress::ProgressHandler;
use crate::shell;
use crate::template::{Step, Template};
use serde_json::Value;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub struct Pipeline {
    type_name: String,
    config: Template,
    instance_operations: BTreeMap<String, InstanceOperation>,
    logger: OnceCell<Logger>,
    current_phase: Option<Phase>,
    // set while a step executes; the executor logs step failures
    in_step: bool,
    progress: Option<Arc<dyn ProgressHandler>>,
}

impl Pipeline {
    /// Constructs an instance of `pipeline_type`.
    ///
    /// Attaches capabilities the type's policy selects (running their hooks
    /// once), copies the template, resolves flags and log settings, then
    /// checks required flags. Fails without running anything if a hook
    /// fails or a required flag is missing.
    pub fn new(pipeline_type: &mut PipelineType, options: PipelineOptions) -> Result<Self> {
        match &options.registry {
            Some(registry) => pipeline_type.attach_capabilities_from(registry)?,
            None => pipeline_type.attach_capabilities()?,
        };

        let env = options
            .env
            .clone()
            .or_else(|| pipeline_type.env_overrides().cloned())
            .unwrap_or_else(EnvOverrides::from_env);
        let mut config = pipeline_type.template().clone();

        let env_flags = options.use_env.then_some(&env);
        config.flags.values = flags::resolve(&config.flags.values, &options.flags, env_flags);

        let explicit = LogSettings {
            level: options
                .flags
                .get(LOG_LEVEL_FLAG)
                .map(|v| Severity::parse(&value_to_string(v))),
            sink: options
                .flags
                .get(LOG_SINK_FLAG)
                .map(|v| LogSink::parse(&value_to_string(v))),
        };
        config.log_settings = explicit.overlay(&env.log_settings().overlay(&config.log_settings));

        let pipeline = Self {
            type_name: pipeline_type.name().to_string(),
            config,
            instance_operations: pipeline_type.instance_operations().clone(),
            logger: OnceCell::new(),
            current_phase: None,
            in_step: false,
            progress: options.progress,
        };

        if let Err(err) =
            flags::validate_required(&pipeline.config.flags.expected, &pipeline.config.flags.values)
        {
            pipeline.log(Severity::Fatal, &err.to_string());
            return Err(err);
        }

        debug!(
            pipeline = %pipeline.type_name,
            flags = pipeline.config.flags.values.len(),
            steps = pipeline.config.step_count(),
            "Constructed pipeline"
        );
        Ok(pipeline)
    }

    /// Name of the type this instance was built from
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The instance's working copy of its type's template
    pub fn config(&self) -> &Template {
        &self.config
    }

    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.config.flags.values.get(name)
    }

    /// Flag as a string; `None` when absent or null
    pub fn flag_str(&self, name: &str) -> Option<String> {
        self.flag(name)
            .filter(|v| !v.is_null())
            .map(value_to_string)
    }

    pub fn flags(&self) -> &FlagMap {
        &self.config.flags.values
    }

    /// Overwrites a flag on this instance only
    pub fn set_flag(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.config.flags.set(name, value);
    }

    /// Reads a flag, failing with a flag failure carrying `message` when it
    /// is absent or null
    pub fn require_flag(&self, name: &str, message: &str) -> Result<&Value> {
        match self.flag(name) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(self.raise(PipelineError::flag(message))),
        }
    }

    /// Escapes `value` as a single shell argument
    pub fn esc(&self, value: &str) -> String {
        shell::escape(value)
    }

    pub fn esc_flag(&self, name: &str) -> Option<String> {
        self.flag_str(name).map(|v| shell::escape(&v))
    }

    pub fn esc_artifact(&self, phase: Phase, name: &str) -> Option<String> {
        self.artifact(phase, name)
            .filter(|v| !v.is_null())
            .map(|v| shell::escape(&value_to_string(v)))
    }

    /// Records an artifact against the phase currently executing. Does
    /// nothing outside a run.
    pub fn push_artifact(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.config.artifacts.push(self.current_phase, name, value);
    }

    pub fn artifact(&self, phase: Phase, name: &str) -> Option<&Value> {
        self.config.artifacts.get(phase, name)
    }

    pub fn artifacts(&self, phase: Phase) -> &ArtifactMap {
        self.config.artifacts.phase(phase)
    }

    pub fn all_artifacts(&self) -> &BTreeMap<Phase, ArtifactMap> {
        self.config.artifacts.all()
    }

    /// Reads an artifact, failing with an artifact failure carrying
    /// `message` when it was never recorded
    pub fn require_artifact(&self, phase: Phase, name: &str, message: &str) -> Result<&Value> {
        match self.artifact(phase, name) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(self.raise(PipelineError::artifact(message))),
        }
    }

    /// Instance logger, built on first use from the resolved log settings
    pub fn logger(&self) -> &Logger {
        self.logger.get_or_init(|| {
            Logger::from_settings(progname_for(&self.type_name), &self.config.log_settings)
        })
    }

    pub fn log(&self, severity: Severity, message: &str) {
        self.logger().log(severity, message);
    }

    pub fn log_settings(&self) -> &LogSettings {
        &self.config.log_settings
    }

    pub fn set_log_level(&mut self, level: Severity) {
        self.config.log_settings.level = Some(level);
        self.logger.take();
    }

    pub fn set_log_sink(&mut self, sink: LogSink) {
        self.config.log_settings.sink = Some(sink);
        self.logger.take();
    }

    /// Logs `message` at fatal and returns it as a build failure
    pub fn fail_build<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(self.raise(PipelineError::build(message)))
    }

    /// Logs a failure raised outside a step at fatal. Inside a step the
    /// executor logs it once the step returns.
    fn raise(&self, err: PipelineError) -> PipelineError {
        if !self.in_step {
            self.log(Severity::Fatal, &err.to_string());
        }
        err
    }

    /// Appends a step to `phase` on this instance only
    pub fn append_step<F>(&mut self, phase: Phase, step: F)
    where
        F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.config.append(phase, Step::new(step));
    }

    /// Inserts a step at the front of `phase` on this instance only
    pub fn prepend_step<F>(&mut self, phase: Phase, step: F)
    where
        F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.config.prepend(phase, Step::new(step));
    }

    pub fn steps(&self, phase: Phase) -> &[Step] {
        self.config.steps(phase)
    }

    /// Phase whose steps are executing, if any
    pub fn current_phase(&self) -> Option<Phase> {
        self.current_phase
    }

    /// Whether an attached capability contributed instance operation `name`
    pub fn responds_to(&self, name: &str) -> bool {
        self.instance_operations.contains_key(name)
    }

    /// Invokes an instance operation outside a step
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let phase = self.current_phase;
        self.scoped(phase).call(name, args)
    }

    fn instance_operation(&self, name: &str) -> Result<InstanceOperation> {
        self.instance_operations
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownOperation {
                name: name.to_string(),
            })
    }

    fn scoped(&mut self, phase: Option<Phase>) -> StepContext<'_> {
        StepContext::new(self, phase)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("type_name", &self.type_name)
            .field("config", &self.config)
            .field(
                "instance_operations",
                &self.instance_operations.keys().collect::<Vec<_>>(),
            )
            .field("current_phase", &self.current_phase)
            .finish()
    }
}
