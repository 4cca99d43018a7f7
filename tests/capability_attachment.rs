//! Capability registration and attachment

use phaseline::{
    register_capability, Capability, CapabilityModule, CapabilityRegistry, EnvOverrides,
    InstanceOperation, Phase, PipelineError, PipelineOptions, PipelineType, Result, Severity,
    StepContext, TypeOperation,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn dummy() -> CapabilityModule {
    CapabilityModule::new("Dummy")
        .type_operation("dummy_class_method", |_ty, _args| Ok(json!("class value")))
        .instance_operation("dummy_instance_method", |_ctx, _args| {
            Ok(json!("instance value"))
        })
}

fn failer() -> CapabilityModule {
    CapabilityModule::new("Failer").on_attach(|ty| ty.fail_build("Failer should not be included"))
}

fn registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(failer()));
    registry.register(Arc::new(dummy()));
    registry
}

fn options(registry: CapabilityRegistry) -> PipelineOptions {
    PipelineOptions::new()
        .with_env(EnvOverrides::default())
        .with_registry(registry)
}

fn quiet(name: &str) -> PipelineType {
    let mut ty = PipelineType::new(name);
    ty.set_log_level(Severity::None);
    ty
}

/// Capability implemented directly on a type rather than through the builder
struct Credentials {
    attached: Arc<AtomicUsize>,
}

impl Capability for Credentials {
    fn name(&self) -> &str {
        "Credentials"
    }

    fn instance_operations(&self) -> Vec<(String, InstanceOperation)> {
        let op: InstanceOperation = Arc::new(|ctx: &mut StepContext<'_>, _args: &[Value]| -> Result<Value> {
            let token = ctx.require_flag("token", "A publish token is required")?.clone();
            ctx.push_artifact("credentials", token);
            Ok(Value::Null)
        });
        vec![("write_credentials".to_string(), op)]
    }

    fn type_operations(&self) -> Vec<(String, TypeOperation)> {
        let op: TypeOperation =
            Arc::new(|ty: &PipelineType, _args: &[Value]| -> Result<Value> { Ok(json!(ty.name())) });
        vec![("credentials_owner".to_string(), op)]
    }

    fn on_attach(&self, target: &mut PipelineType) -> Result<()> {
        self.attached.fetch_add(1, Ordering::SeqCst);
        target.phase(Phase::Setup, |ctx| {
            ctx.call("write_credentials", &[])?;
            Ok(())
        });
        Ok(())
    }
}

#[test]
fn test_explicit_policy_attaches_only_named() {
    let mut ty = quiet("Release");
    ty.include(["Dummy"]);

    let mut pipeline = ty.instantiate(options(registry())).unwrap();

    assert_eq!(ty.attached_capabilities(), &["Dummy".to_string()]);
    assert!(!ty.has_capability("Failer"));
    assert_eq!(ty.call("dummy_class_method", &[]).unwrap(), json!("class value"));
    assert_eq!(
        pipeline.call("dummy_instance_method", &[]).unwrap(),
        json!("instance value")
    );
}

#[test]
fn test_qualified_policy_entry_matches_simple_name() {
    let mut ty = quiet("Release");
    ty.include(["release::common::Dummy"]);

    ty.instantiate(options(registry())).unwrap();
    assert!(ty.has_capability("Dummy"));
}

#[test]
fn test_none_policy_attaches_nothing() {
    let mut ty = quiet("Release");
    ty.include_none();

    ty.instantiate(options(registry())).unwrap();
    assert!(ty.attached_capabilities().is_empty());
    assert!(!ty.responds_to("dummy_class_method"));
}

#[test]
fn test_all_policy_aborts_on_failing_hook() {
    let mut ty = quiet("Release");
    ty.include_all();

    let err = ty.instantiate(options(registry())).unwrap_err();
    assert!(matches!(err, PipelineError::Build(ref m) if m == "Failer should not be included"));
    assert!(!ty.has_capability("Failer"));
    assert!(!ty.has_capability("Dummy"));
}

#[test]
fn test_attachment_runs_once_per_type() {
    let attached = Arc::new(AtomicUsize::new(0));
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(Credentials {
        attached: attached.clone(),
    }));

    let mut ty = quiet("Release");
    ty.include(["Credentials"]);

    for token in ["first", "second"] {
        let mut pipeline = ty
            .instantiate(options(registry.clone()).with_flag("token", token))
            .unwrap();
        pipeline.run().unwrap();
        assert_eq!(
            pipeline.artifact(Phase::Setup, "credentials"),
            Some(&json!(token))
        );
    }
    ty.attach_capabilities_from(&registry).unwrap();

    assert_eq!(attached.load(Ordering::SeqCst), 1);
    assert_eq!(ty.template().steps(Phase::Setup).len(), 1);
    assert_eq!(ty.call("credentials_owner", &[]).unwrap(), json!("Release"));
}

#[test]
fn test_instance_operation_failure_aborts_run() {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(Credentials {
        attached: Arc::new(AtomicUsize::new(0)),
    }));

    let mut ty = quiet("Release");
    ty.include(["Credentials"]);

    let mut pipeline = ty.instantiate(options(registry)).unwrap();
    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, PipelineError::Flag(ref m) if m == "A publish token is required"));
}

#[test]
fn test_derived_type_keeps_parent_capabilities() {
    let mut base = quiet("Base");
    base.include(["Dummy"]);
    base.attach_capabilities_from(&registry()).unwrap();

    let mut child = base.derive("Child");
    assert!(child.has_capability("Dummy"));

    child.instantiate(options(registry())).unwrap();
    assert_eq!(child.attached_capabilities(), &["Dummy".to_string()]);
    assert_eq!(child.call("dummy_class_method", &[]).unwrap(), json!("class value"));
}

#[test]
fn test_process_wide_registry() {
    assert!(register_capability(
        CapabilityModule::new("GlobalAudit")
            .type_operation("audit_label", |ty, _args| Ok(json!(format!("audit:{}", ty.name())))),
    ));
    assert!(!register_capability(CapabilityModule::new("GlobalAudit")));

    let mut ty = quiet("Release");
    ty.include(["GlobalAudit"]);
    let pipeline = ty
        .instantiate(PipelineOptions::new().with_env(EnvOverrides::default()))
        .unwrap();

    assert_eq!(pipeline.type_name(), "Release");
    assert_eq!(ty.call("audit_label", &[]).unwrap(), json!("audit:Release"));
}
