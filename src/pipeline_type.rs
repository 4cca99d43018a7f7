//! Pipeline types
//!
//! A [`PipelineType`] is a named pipeline definition: it owns a
//! [`Template`], the capabilities attached to it, the operations those
//! capabilities contributed, and a lazily built type-level logger.
//!
//! Declarative operations (`set_flag`, `expect_flags`, `include*`,
//! `set_log_*`, `phase`, `prepend_phase`) only ever touch this type's own
//! template. [`PipelineType::derive`] deep-copies the template so later
//! changes to either side never reach the other.

use crate::capability::{
    self, Capability, CapabilityPolicy, CapabilityRegistry, InstanceOperation, TypeOperation,
};
use crate::config::EnvOverrides;
use crate::error::{PipelineError, Result};
use crate::logger::{progname_for, LogSettings, LogSink, Logger, Severity};
use crate::phase::Phase;
use crate::pipeline::{Pipeline, PipelineOptions, StepContext};
use crate::template::{Step, Template};
use serde_json::Value;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PipelineType {
    name: String,
    template: Template,
    attached: Vec<String>,
    type_operations: BTreeMap<String, TypeOperation>,
    instance_operations: BTreeMap<String, InstanceOperation>,
    // log settings set through set_log_*; they beat the environment
    log_override: LogSettings,
    env: Option<EnvOverrides>,
    in_hook: bool,
    logger: OnceCell<Logger>,
}

impl PipelineType {
    /// A root type with an empty template
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_template(name, Template::default())
    }

    pub fn with_template(name: impl Into<String>, template: Template) -> Self {
        Self {
            name: name.into(),
            template,
            attached: Vec::new(),
            type_operations: BTreeMap::new(),
            instance_operations: BTreeMap::new(),
            log_override: LogSettings::default(),
            env: None,
            in_hook: false,
            logger: OnceCell::new(),
        }
    }

    /// Declares a child type from this type's current state.
    ///
    /// The child inherits a deep copy of the template, the attached
    /// capability list and their operations. Hooks of inherited capabilities
    /// do not run again.
    pub fn derive(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(parent = %self.name, child = %name, "Deriving pipeline type");
        Self {
            name,
            template: self.template.clone(),
            attached: self.attached.clone(),
            type_operations: self.type_operations.clone(),
            instance_operations: self.instance_operations.clone(),
            log_override: self.log_override.clone(),
            env: self.env.clone(),
            in_hook: false,
            logger: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.template.flags.set(name, value);
        self
    }

    /// Replaces the set of flags every instance must resolve
    pub fn expect_flags<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template.flags.expect(names);
        self
    }

    pub fn include_none(&mut self) -> &mut Self {
        self.template.capability_policy = CapabilityPolicy::None;
        self
    }

    pub fn include_all(&mut self) -> &mut Self {
        self.template.capability_policy = CapabilityPolicy::All;
        self
    }

    /// Adds names to the explicit inclusion set, starting a fresh set if
    /// the policy was `None` or `All`
    pub fn include<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let policy = &mut self.template.capability_policy;
        if !matches!(policy, CapabilityPolicy::Only(_)) {
            *policy = CapabilityPolicy::Only(Vec::new());
        }
        if let CapabilityPolicy::Only(entries) = policy {
            entries.extend(names.into_iter().map(Into::into));
        }
        self
    }

    pub fn capability_policy(&self) -> &CapabilityPolicy {
        &self.template.capability_policy
    }

    /// Sets the default level for instances. The type logger picks it up
    /// immediately, ahead of `PHASELINE_LOG_LEVEL`.
    pub fn set_log_level(&mut self, level: Severity) -> &mut Self {
        self.template.log_settings.level = Some(level);
        self.log_override.level = Some(level);
        self.logger.take();
        self
    }

    pub fn set_log_sink(&mut self, sink: LogSink) -> &mut Self {
        self.template.log_settings.sink = Some(sink.clone());
        self.log_override.sink = Some(sink);
        self.logger.take();
        self
    }

    /// Uses `env` instead of the process environment for this type's logger
    /// and for instances built without their own overrides
    pub fn set_env_overrides(&mut self, env: EnvOverrides) -> &mut Self {
        self.env = Some(env);
        self.logger.take();
        self
    }

    pub(crate) fn env_overrides(&self) -> Option<&EnvOverrides> {
        self.env.as_ref()
    }

    pub fn log_settings(&self) -> &LogSettings {
        &self.template.log_settings
    }

    /// Appends a step to `phase`
    pub fn phase<F>(&mut self, phase: Phase, step: F) -> &mut Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.add_step(phase, Step::new(step))
    }

    /// Inserts a step at the front of `phase`
    pub fn prepend_phase<F>(&mut self, phase: Phase, step: F) -> &mut Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.prepend_step(phase, Step::new(step))
    }

    pub fn add_step(&mut self, phase: Phase, step: Step) -> &mut Self {
        self.template.append(phase, step);
        self
    }

    pub fn prepend_step(&mut self, phase: Phase, step: Step) -> &mut Self {
        self.template.prepend(phase, step);
        self
    }

    /// Installs a type-level operation, replacing any with the same name
    pub fn add_type_operation<F>(&mut self, name: impl Into<String>, op: F) -> &mut Self
    where
        F: Fn(&PipelineType, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.type_operations.insert(name.into(), Arc::new(op));
        self
    }

    /// Installs an instance-level operation, replacing any with the same name
    pub fn add_instance_operation<F>(&mut self, name: impl Into<String>, op: F) -> &mut Self
    where
        F: Fn(&mut StepContext<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.instance_operations.insert(name.into(), Arc::new(op));
        self
    }

    /// Invokes a type-level operation by name
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let op = self
            .type_operations
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownOperation {
                name: name.to_string(),
            })?;
        op(self, args)
    }

    /// Whether a type- or instance-level operation named `name` exists
    pub fn responds_to(&self, name: &str) -> bool {
        self.type_operations.contains_key(name) || self.instance_operations.contains_key(name)
    }

    pub(crate) fn instance_operations(&self) -> &BTreeMap<String, InstanceOperation> {
        &self.instance_operations
    }

    /// Names of attached capabilities, in attachment order
    pub fn attached_capabilities(&self) -> &[String] {
        &self.attached
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.attached.iter().any(|n| n == name)
    }

    /// Resolves the inclusion policy against the process-wide registry
    pub fn attach_capabilities(&mut self) -> Result<Vec<String>> {
        let registry = capability::global_snapshot();
        self.attach_capabilities_from(&registry)
    }

    /// Attaches every capability the policy selects that is not attached
    /// yet, in registration order. Returns the names attached by this call.
    ///
    /// Safe to call repeatedly: an attached capability is never attached
    /// again, so its operations are installed and its hook runs once.
    pub fn attach_capabilities_from(&mut self, registry: &CapabilityRegistry) -> Result<Vec<String>> {
        if self.template.capability_policy.is_none() {
            return Ok(Vec::new());
        }

        let mut newly_attached = Vec::new();
        for capability in registry.select(&self.template.capability_policy) {
            if self.has_capability(capability.name()) {
                continue;
            }
            self.attach(capability.as_ref())?;
            newly_attached.push(capability.name().to_string());
        }

        if !newly_attached.is_empty() {
            info!(
                pipeline = %self.name,
                capabilities = ?newly_attached,
                "Attached capabilities"
            );
        }
        Ok(newly_attached)
    }

    /// Installs operations, then runs the hook. A failing hook rolls the
    /// operations back and leaves the capability unattached.
    fn attach(&mut self, capability: &dyn Capability) -> Result<()> {
        let type_ops = capability.type_operations();
        let instance_ops = capability.instance_operations();

        let previous_type_ops = self.type_operations.clone();
        let previous_instance_ops = self.instance_operations.clone();

        self.type_operations.extend(type_ops);
        self.instance_operations.extend(instance_ops);

        self.in_hook = true;
        let outcome = capability.on_attach(self);
        self.in_hook = false;

        if let Err(err) = outcome {
            debug!(
                pipeline = %self.name,
                capability = capability.name(),
                error = %err,
                "Capability hook failed"
            );
            self.log(Severity::Fatal, &err.to_string());
            self.type_operations = previous_type_ops;
            self.instance_operations = previous_instance_ops;
            return Err(err);
        }

        self.attached.push(capability.name().to_string());
        Ok(())
    }

    /// Type-level logger: settings from `set_log_*`, then the environment,
    /// then the template, then the default
    pub fn logger(&self) -> &Logger {
        self.logger.get_or_init(|| {
            let env = self.env.clone().unwrap_or_else(EnvOverrides::from_env);
            let settings = self
                .log_override
                .overlay(&env.log_settings().overlay(&self.template.log_settings));
            Logger::from_settings(progname_for(&self.name), &settings)
        })
    }

    pub fn log(&self, severity: Severity, message: &str) {
        self.logger().log(severity, message);
    }

    /// Logs `message` at fatal and returns it as a build failure
    pub fn fail_build<T>(&self, message: impl Into<String>) -> Result<T> {
        let message = message.into();
        // attach logs hook failures itself
        if !self.in_hook {
            self.log(Severity::Fatal, &message);
        }
        Err(PipelineError::Build(message))
    }

    /// Constructs an instance; see [`Pipeline::new`]
    pub fn instantiate(&mut self, options: PipelineOptions) -> Result<Pipeline> {
        Pipeline::new(self, options)
    }
}

impl fmt::Debug for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineType")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("attached", &self.attached)
            .field("type_operations", &self.type_operations.keys().collect::<Vec<_>>())
            .field(
                "instance_operations",
                &self.instance_operations.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityModule;
    use serde_json::json;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    fn counting_module(name: &str, hits: Arc<AtomicUsize>) -> Arc<CapabilityModule> {
        Arc::new(
            CapabilityModule::new(name)
                .type_operation("probe", |_ty, _args| Ok(json!("probe")))
                .on_attach(move |_ty| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
    }

    #[test]
    fn test_derive_isolates_templates() {
        let mut base = PipelineType::new("Base");
        base.set_flag("channel", "stable");

        let mut left = base.derive("Left");
        let right = base.derive("Right");

        left.set_flag("channel", "beta")
            .phase(Phase::Build, |_ctx| Ok(()));

        assert_eq!(base.template().flags.values["channel"], json!("stable"));
        assert_eq!(right.template().flags.values["channel"], json!("stable"));
        assert_eq!(left.template().flags.values["channel"], json!("beta"));
        assert!(base.template().steps(Phase::Build).is_empty());
        assert!(right.template().steps(Phase::Build).is_empty());
        assert_eq!(left.template().steps(Phase::Build).len(), 1);
    }

    #[test]
    fn test_include_accumulates() {
        let mut ty = PipelineType::new("Release");
        ty.include(["Dummy"]).include(["Credentials"]);
        assert_eq!(
            ty.capability_policy(),
            &CapabilityPolicy::Only(vec!["Dummy".to_string(), "Credentials".to_string()])
        );

        ty.include_all();
        assert_eq!(ty.capability_policy(), &CapabilityPolicy::All);

        ty.include(["Dummy"]);
        assert_eq!(
            ty.capability_policy(),
            &CapabilityPolicy::Only(vec!["Dummy".to_string()])
        );
    }

    #[test]
    fn test_attach_is_idempotent() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = CapabilityRegistry::new();
        registry.register(counting_module("Counter", hits.clone()));

        let mut ty = PipelineType::new("Release");
        ty.include_all();

        assert_eq!(ty.attach_capabilities_from(&registry).unwrap(), vec!["Counter"]);
        assert!(ty.attach_capabilities_from(&registry).unwrap().is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ty.attached_capabilities(), &["Counter".to_string()]);
    }

    #[test]
    fn test_policy_none_attaches_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = CapabilityRegistry::new();
        registry.register(counting_module("Counter", hits.clone()));

        let mut ty = PipelineType::new("Release");
        assert!(ty.attach_capabilities_from(&registry).unwrap().is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!ty.responds_to("probe"));
    }

    #[test]
    fn test_failing_hook_rolls_back() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(
            CapabilityModule::new("Failer")
                .type_operation("failer_op", |_ty, _args| Ok(Value::Null))
                .on_attach(|ty| ty.fail_build("Failer was included")),
        ));

        let mut ty = PipelineType::new("Release");
        ty.include_all().set_log_level(Severity::None);

        let err = ty.attach_capabilities_from(&registry).unwrap_err();
        assert_eq!(err.to_string(), "Failer was included");
        assert!(!ty.has_capability("Failer"));
        assert!(!ty.responds_to("failer_op"));
    }

    #[test]
    fn test_attach_order_follows_registration() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CapabilityRegistry::new();
        for name in ["Second", "First"] {
            let order = order.clone();
            registry.register(Arc::new(CapabilityModule::new(name).on_attach(move |_ty| {
                order
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(name.to_string());
                Ok(())
            })));
        }

        let mut ty = PipelineType::new("Release");
        ty.include(["First", "Second"]);
        ty.attach_capabilities_from(&registry).unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["Second", "First"]);
    }

    #[test]
    fn test_derived_type_inherits_attachment() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = CapabilityRegistry::new();
        registry.register(counting_module("Counter", hits.clone()));

        let mut base = PipelineType::new("Base");
        base.include_all();
        base.attach_capabilities_from(&registry).unwrap();

        let mut child = base.derive("Child");
        child.attach_capabilities_from(&registry).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(child.call("probe", &[]).unwrap(), json!("probe"));
    }

    #[test]
    fn test_unknown_type_operation() {
        let ty = PipelineType::new("Release");
        let err = ty.call("missing", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownOperation { .. }));
    }

    #[test]
    #[serial]
    fn test_type_logger_rebuilt_on_level_change() {
        let mut ty = PipelineType::new("Release");
        ty.set_log_level(Severity::Warn);
        assert_eq!(ty.logger().threshold(), Severity::Warn);
        assert_eq!(ty.logger().progname(), "<phaseline/Release>");

        ty.set_log_level(Severity::Debug);
        assert_eq!(ty.logger().threshold(), Severity::Debug);
    }

    #[test]
    fn test_level_set_on_type_beats_env_overrides() {
        let mut ty = PipelineType::new("Release");
        ty.set_env_overrides(EnvOverrides::from_vars([("PHASELINE_LOG_LEVEL", "error")]));
        assert_eq!(ty.logger().threshold(), Severity::Error);

        ty.set_log_level(Severity::Debug);
        assert_eq!(ty.logger().threshold(), Severity::Debug);

        let child = ty.derive("Child");
        assert_eq!(child.logger().threshold(), Severity::Debug);
    }
}
