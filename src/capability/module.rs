use super::{Capability, InstanceOperation, TypeOperation};
use crate::error::Result;
use crate::pipeline::StepContext;
use crate::pipeline_type::PipelineType;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type AttachHook = Arc<dyn Fn(&mut PipelineType) -> Result<()> + Send + Sync>;

/// Closure-backed [`Capability`] built up with chained calls
#[derive(Clone)]
pub struct CapabilityModule {
    name: String,
    type_operations: Vec<(String, TypeOperation)>,
    instance_operations: Vec<(String, InstanceOperation)>,
    hook: Option<AttachHook>,
}

impl CapabilityModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_operations: Vec::new(),
            instance_operations: Vec::new(),
            hook: None,
        }
    }

    pub fn type_operation<F>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(&PipelineType, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.type_operations.push((name.into(), Arc::new(op)));
        self
    }

    pub fn instance_operation<F>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(&mut StepContext<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.instance_operations.push((name.into(), Arc::new(op)));
        self
    }

    /// Replaces the attach hook
    pub fn on_attach<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut PipelineType) -> Result<()> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }
}

impl Capability for CapabilityModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_operations(&self) -> Vec<(String, TypeOperation)> {
        self.type_operations.clone()
    }

    fn instance_operations(&self) -> Vec<(String, InstanceOperation)> {
        self.instance_operations.clone()
    }

    fn on_attach(&self, target: &mut PipelineType) -> Result<()> {
        match &self.hook {
            Some(hook) => hook(target),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for CapabilityModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_ops: Vec<&str> = self.type_operations.iter().map(|(n, _)| n.as_str()).collect();
        let instance_ops: Vec<&str> = self
            .instance_operations
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        f.debug_struct("CapabilityModule")
            .field("name", &self.name)
            .field("type_operations", &type_ops)
            .field("instance_operations", &instance_ops)
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_operations() {
        let module = CapabilityModule::new("Dummy")
            .type_operation("dummy_class_method", |_ty, _args| Ok(json!("class value")))
            .instance_operation("dummy_instance_method", |_ctx, _args| {
                Ok(json!("instance value"))
            });

        assert_eq!(module.name(), "Dummy");
        assert_eq!(module.type_operations().len(), 1);
        assert_eq!(module.instance_operations()[0].0, "dummy_instance_method");
    }

    #[test]
    fn test_hook_runs_against_target() {
        let module = CapabilityModule::new("Defaults").on_attach(|ty| {
            ty.set_flag("channel", "stable");
            Ok(())
        });

        let mut target = PipelineType::new("Release");
        Capability::on_attach(&module, &mut target).unwrap();
        assert_eq!(target.template().flags.values["channel"], json!("stable"));
    }

    #[test]
    fn test_missing_hook_is_noop() {
        let module = CapabilityModule::new("Plain");
        let mut target = PipelineType::new("Release");
        assert!(Capability::on_attach(&module, &mut target).is_ok());
    }

    #[test]
    fn test_debug_lists_operation_names() {
        let module = CapabilityModule::new("Dummy")
            .type_operation("dummy_class_method", |_ty, _args| Ok(Value::Null));
        let debug = format!("{:?}", module);
        assert!(debug.contains("dummy_class_method"));
        assert!(debug.contains("has_hook: false"));
    }
}
