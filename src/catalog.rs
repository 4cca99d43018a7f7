//! Pipeline type catalog
//!
//! An explicit map of pipeline types keyed by name. Every type is defined
//! from an existing one, starting at the base type [`Catalog::BASE`], and
//! receives its own deep copy of the parent's template at definition time.

use crate::error::{PipelineError, Result};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::pipeline_type::PipelineType;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug)]
pub struct Catalog {
    types: BTreeMap<String, PipelineType>,
}

impl Default for Catalog {
    fn default() -> Self {
        let mut types = BTreeMap::new();
        types.insert(Self::BASE.to_string(), PipelineType::new(Self::BASE));
        Self { types }
    }
}

impl Catalog {
    /// Name of the root type every catalog starts with
    pub const BASE: &'static str = "Pipeline";

    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name` as a child of the base type
    pub fn define(&mut self, name: &str) -> Result<&mut PipelineType> {
        self.derive(name, Self::BASE)
    }

    /// Defines `name` as a child of `parent`, copying the parent's current
    /// template
    pub fn derive(&mut self, name: &str, parent: &str) -> Result<&mut PipelineType> {
        if self.types.contains_key(name) {
            return Err(PipelineError::DuplicateType(name.to_string()));
        }
        let child = self
            .types
            .get(parent)
            .ok_or_else(|| PipelineError::UnknownType(parent.to_string()))?
            .derive(name);

        debug!(name, parent, "Defined pipeline type");
        Ok(self.types.entry(name.to_string()).or_insert(child))
    }

    pub fn get(&self, name: &str) -> Option<&PipelineType> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PipelineType> {
        self.types.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Constructs an instance of the named type
    pub fn instantiate(&mut self, name: &str, options: PipelineOptions) -> Result<Pipeline> {
        self.types
            .get_mut(name)
            .ok_or_else(|| PipelineError::UnknownType(name.to_string()))?
            .instantiate(options)
    }
}
