//! Environment-derived configuration
//!
//! Pipelines consult the process environment for two things:
//!
//! - `PHASELINE_FLAG_<NAME>`: contributes flag `<name>` (lowercased), value
//!   taken verbatim as a string
//! - `PHASELINE_LOG_LEVEL` / `PHASELINE_LOG_SINK`: override the template's
//!   log settings unless a constructor flag sets them explicitly
//!
//! The environment is snapshotted once per construction into an
//! [`EnvOverrides`], which can also be built from any key/value iterator so
//! hosts and tests can supply their own environment.
//!
//! # Example
//!
//! ```
//! use phaseline::config::EnvOverrides;
//!
//! let env = EnvOverrides::from_vars([
//!     ("PHASELINE_FLAG_GEM_VERSION", "1.0.0"),
//!     ("PHASELINE_LOG_LEVEL", "debug"),
//!     ("HOME", "/root"),
//! ]);
//!
//! assert_eq!(env.flags.get("gem_version").map(String::as_str), Some("1.0.0"));
//! assert_eq!(env.log_level.as_deref(), Some("debug"));
//! ```

use crate::logger::{LogSettings, LogSink, Severity};
use std::collections::BTreeMap;
use std::env;

/// Prefix marking an environment variable as a flag
pub const FLAG_ENV_PREFIX: &str = "PHASELINE_FLAG_";

/// Log level override
pub const LOG_LEVEL_ENV: &str = "PHASELINE_LOG_LEVEL";

/// Log sink override (`stdout`, `stderr` or a file path)
pub const LOG_SINK_ENV: &str = "PHASELINE_LOG_SINK";

/// Constructor flag that explicitly sets an instance's log level
pub const LOG_LEVEL_FLAG: &str = "log_level";

/// Constructor flag that explicitly sets an instance's log sink
pub const LOG_SINK_FLAG: &str = "log_sink";

/// Flag naming the directory the build-scoped phases run in
pub const BUILD_ROOT_FLAG: &str = "build_root";

/// Snapshot of everything a pipeline reads from its environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Flags from `PHASELINE_FLAG_*`, keyed by lowercased remainder
    pub flags: BTreeMap<String, String>,

    pub log_level: Option<String>,

    pub log_sink: Option<String>,
}

impl EnvOverrides {
    /// Reads the current process environment
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut overrides = Self::default();

        for (key, value) in vars {
            let key = key.as_ref();
            if let Some(name) = key.strip_prefix(FLAG_ENV_PREFIX) {
                if !name.is_empty() {
                    overrides.flags.insert(name.to_lowercase(), value.into());
                }
            } else if key == LOG_LEVEL_ENV {
                overrides.log_level = Some(value.into());
            } else if key == LOG_SINK_ENV {
                overrides.log_sink = Some(value.into());
            }
        }

        overrides
    }

    /// Log settings contributed by the environment layer
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            level: self.log_level.as_deref().map(Severity::parse),
            sink: self.log_sink.as_deref().map(LogSink::parse),
        }
    }
}
