use super::{Capability, CapabilityPolicy};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Capabilities in registration order, at most one per name
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: Vec<Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `capability` unless one with the same name exists.
    ///
    /// Returns `false` when the name was already taken.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> bool {
        if self.contains(capability.name()) {
            debug!(capability = capability.name(), "Capability already registered");
            return false;
        }

        debug!(capability = capability.name(), "Registered capability");
        self.capabilities.push(capability);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.iter().find(|c| c.name() == name).cloned()
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Capabilities `policy` selects, in registration order
    pub fn select(&self, policy: &CapabilityPolicy) -> Vec<Arc<dyn Capability>> {
        self.capabilities
            .iter()
            .filter(|c| policy.admits(c.name()))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<RwLock<CapabilityRegistry>> = OnceLock::new();

/// The process-wide registry instances resolve against by default
pub fn global_registry() -> &'static RwLock<CapabilityRegistry> {
    GLOBAL.get_or_init(|| RwLock::new(CapabilityRegistry::new()))
}

/// Registers `capability` in the process-wide registry
pub fn register_capability<C: Capability + 'static>(capability: C) -> bool {
    global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(Arc::new(capability))
}

/// Copy of the process-wide registry, so attach hooks run without the lock
pub(crate) fn global_snapshot() -> CapabilityRegistry {
    global_registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
