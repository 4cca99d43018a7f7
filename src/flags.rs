//! Flag resolution
//!
//! Flags are merged once, at construction, from three layers. Later layers
//! override earlier ones:
//!
//! 1. template defaults declared on the pipeline type
//! 2. values supplied to the constructor
//! 3. `PHASELINE_FLAG_*` environment variables, unless disabled
//!
//! After merging, every expected flag must be present or construction fails
//! with a build failure naming the missing flags.

use crate::config::EnvOverrides;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub type FlagMap = BTreeMap<String, Value>;

/// Flag defaults and the required-flag declaration of a template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSet {
    pub values: FlagMap,

    /// Required flag names, in declaration order
    pub expected: Vec<String>,
}

impl FlagSet {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Replaces the required set, dropping duplicates
    pub fn expect<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected.clear();
        for name in names {
            let name = name.into();
            if !self.expected.contains(&name) {
                self.expected.push(name);
            }
        }
    }
}

/// Merges the three flag layers
pub fn resolve(defaults: &FlagMap, constructor: &FlagMap, env: Option<&EnvOverrides>) -> FlagMap {
    let mut merged = defaults.clone();
    merged.extend(constructor.iter().map(|(k, v)| (k.clone(), v.clone())));

    if let Some(env) = env {
        merged.extend(
            env.flags
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone()))),
        );
    }

    debug!(
        defaults = defaults.len(),
        constructor = constructor.len(),
        env = env.map(|e| e.flags.len()).unwrap_or(0),
        resolved = merged.len(),
        "Resolved flags"
    );

    merged
}

/// Expected names with no key in `resolved`, in declaration order
pub fn missing<'a>(expected: &'a [String], resolved: &FlagMap) -> Vec<&'a str> {
    expected
        .iter()
        .filter(|name| !resolved.contains_key(name.as_str()))
        .map(String::as_str)
        .collect()
}

/// Fails with a build failure listing every missing required flag
pub fn validate_required(expected: &[String], resolved: &FlagMap) -> Result<()> {
    let missing = missing(expected, resolved);
    if missing.is_empty() {
        return Ok(());
    }

    Err(PipelineError::build(format!(
        "Missing required flags: {}",
        missing.join(", ")
    )))
}

/// String form of a flag or artifact value: strings verbatim, anything
/// else as JSON text
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
