use crate::capability::CapabilityRegistry;
use crate::config::EnvOverrides;
use crate::flags::FlagMap;
use crate::progress::ProgressHandler;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Construction options for a [`Pipeline`](super::Pipeline)
#[derive(Clone)]
pub struct PipelineOptions {
    /// Constructor flag layer
    pub flags: FlagMap,

    /// Whether `PHASELINE_FLAG_*` variables contribute flags
    pub use_env: bool,

    /// Environment snapshot; the process environment when unset
    pub env: Option<EnvOverrides>,

    pub progress: Option<Arc<dyn ProgressHandler>>,

    /// Registry to attach capabilities from; the process-wide one when unset
    pub registry: Option<CapabilityRegistry>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            flags: FlagMap::new(),
            use_env: true,
            env: None,
            progress: None,
            registry: None,
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    pub fn with_flags<I, K, V>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.flags
            .extend(flags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Skips environment flag ingestion. Log overrides still apply.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = Some(handler);
        self
    }

    pub fn with_registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("flags", &self.flags)
            .field("use_env", &self.use_env)
            .field("env", &self.env)
            .field("has_progress", &self.progress.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}
