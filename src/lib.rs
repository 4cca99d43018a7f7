//! phaseline - phased build-and-release pipelines
//!
//! A pipeline type declares steps for five fixed phases (`setup`,
//! `before_build`, `build`, `after_build`, `teardown`), flag defaults and
//! requirements, log settings, and which reusable capabilities it wants.
//! Each instance gets its own copy of that declaration, resolves its flags
//! from defaults, constructor values and `PHASELINE_FLAG_*` environment
//! variables, and runs the phases in order, stopping at the first failure.
//!
//! # Core Concepts
//!
//! - **Template**: per-type prototype, deep-copied on derivation and on
//!   instantiation
//! - **Capability**: named bundle of type operations, instance operations
//!   and a one-shot attach hook
//! - **Artifact**: value a step records against the phase it ran in
//! - **Build root**: the `build_root` flag; the build-scoped phases run
//!   inside that directory
//!
//! # Example
//!
//! ```
//! use phaseline::{Phase, PipelineOptions, PipelineType};
//! use serde_json::json;
//!
//! let mut release = PipelineType::new("Release");
//! release
//!     .expect_flags(["root"])
//!     .phase(Phase::Build, |ctx| {
//!         ctx.push_artifact("out", "v");
//!         Ok(())
//!     });
//!
//! let mut pipeline = release
//!     .instantiate(PipelineOptions::new().with_flag("root", "x").without_env())
//!     .unwrap();
//! pipeline.run().unwrap();
//!
//! assert_eq!(pipeline.artifact(Phase::Build, "out"), Some(&json!("v")));
//! ```

pub mod artifacts;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod error;
pub mod flags;
pub mod logger;
pub mod phase;
pub mod pipeline;
pub mod pipeline_type;
pub mod progress;
pub mod shell;
pub mod template;
pub mod util;

pub use artifacts::{ArtifactMap, ArtifactStore};
pub use capability::{
    register_capability, Capability, CapabilityModule, CapabilityPolicy, CapabilityRegistry,
    InstanceOperation, TypeOperation,
};
pub use catalog::Catalog;
pub use config::EnvOverrides;
pub use error::{PipelineError, Result};
pub use flags::{FlagMap, FlagSet};
pub use logger::{LogSettings, LogSink, Logger, Severity};
pub use phase::Phase;
pub use pipeline::{Pipeline, PipelineOptions, StepContext};
pub use pipeline_type::PipelineType;
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use template::{Step, Template};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
