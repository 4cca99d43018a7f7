//! Reusable behavior bundles attachable to pipeline types
//!
//! A capability has three extension points:
//!
//! - type-level operations, callable on any pipeline type it attaches to
//! - instance-level operations, callable from steps and on instances
//! - an attach hook, run exactly once against the attaching type
//!
//! Capabilities are registered by name in a [`CapabilityRegistry`]. Each
//! pipeline type selects which registered capabilities it wants through its
//! [`CapabilityPolicy`]; resolution walks the registry in registration
//! order, so attachment is deterministic.
//!
//! # Example
//!
//! ```
//! use phaseline::{CapabilityModule, CapabilityRegistry, PipelineType};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut registry = CapabilityRegistry::new();
//! registry.register(Arc::new(
//!     CapabilityModule::new("Dummy")
//!         .type_operation("dummy_class_method", |_ty, _args| Ok(json!("class value"))),
//! ));
//!
//! let mut release = PipelineType::new("Release");
//! release.include(["Dummy"]);
//! release.attach_capabilities_from(&registry).unwrap();
//!
//! assert_eq!(release.call("dummy_class_method", &[]).unwrap(), json!("class value"));
//! ```

mod module;
mod policy;
mod registry;

pub use module::CapabilityModule;
pub use policy::CapabilityPolicy;
pub use registry::{global_registry, register_capability, CapabilityRegistry};
pub(crate) use registry::global_snapshot;

use crate::error::Result;
use crate::pipeline::StepContext;
use crate::pipeline_type::PipelineType;
use serde_json::Value;
use std::sync::Arc;

/// Operation added to a pipeline type
pub type TypeOperation = Arc<dyn Fn(&PipelineType, &[Value]) -> Result<Value> + Send + Sync>;

/// Operation added to every instance of a pipeline type
pub type InstanceOperation =
    Arc<dyn Fn(&mut StepContext<'_>, &[Value]) -> Result<Value> + Send + Sync>;

/// A named bundle of operations plus a one-shot attach hook
pub trait Capability: Send + Sync {
    /// Simple name the inclusion policy matches against
    fn name(&self) -> &str;

    fn type_operations(&self) -> Vec<(String, TypeOperation)> {
        Vec::new()
    }

    fn instance_operations(&self) -> Vec<(String, InstanceOperation)> {
        Vec::new()
    }

    /// Runs once when the capability attaches to `target`. Returning an
    /// error aborts attachment and, with it, instance construction.
    fn on_attach(&self, _target: &mut PipelineType) -> Result<()> {
        Ok(())
    }
}
