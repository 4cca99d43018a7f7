//! Process-wide diagnostics for the engine
//!
//! The engine reports what it is doing (phase boundaries, capability
//! attachment, flag resolution) through `tracing`. Hosts that already run
//! a subscriber get those events for free; everything else can call one of
//! the initializers here. These are separate from the per-pipeline
//! [`Logger`](crate::Logger), which always writes to its own sink.
//!
//! # Example
//!
//! ```no_run
//! use phaseline::util::logging;
//!
//! // PHASELINE_TRACE_LEVEL=debug PHASELINE_TRACE_JSON=true
//! logging::init_from_env();
//!
//! tracing::info!(pipeline = "Release", "Host started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Diagnostics level for the `phaseline` target
pub const TRACE_LEVEL_ENV: &str = "PHASELINE_TRACE_LEVEL";

/// `true` switches diagnostics to JSON lines
pub const TRACE_JSON_ENV: &str = "PHASELINE_TRACE_JSON";

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for engine events
    pub level: Level,

    pub use_json: bool,

    /// Include the module target (e.g. `phaseline::pipeline`)
    pub include_target: bool,

    /// Include file and line
    pub include_location: bool,

    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with location and thread metadata, for CI log collectors
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }
}

/// Parses a diagnostics level, case-insensitively
///
/// ```
/// use phaseline::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
/// assert_eq!(parse_level("loud"), None);
/// ```
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Installs the global subscriber once.
///
/// Later calls are ignored, and so is a subscriber the host installed
/// first. `RUST_LOG` directives are honored on top of `config.level`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = format!("phaseline={}", config.level).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }

        let result = if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        };

        if result.is_err() {
            tracing::debug!("Global subscriber already installed");
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Reads [`TRACE_LEVEL_ENV`] and [`TRACE_JSON_ENV`]; unset or unparsable
/// values keep the defaults
pub fn init_from_env() {
    init_logging(config_from_vars(
        env::var(TRACE_LEVEL_ENV).ok().as_deref(),
        env::var(TRACE_JSON_ENV).ok().as_deref(),
    ));
}

/// Initializes with a level given as text, falling back to info
pub fn with_level(level: &str) {
    init_logging(LoggingConfig::with_level(
        parse_level(level).unwrap_or(Level::INFO),
    ));
}

fn config_from_vars(level: Option<&str>, json: Option<&str>) -> LoggingConfig {
    LoggingConfig {
        level: level.and_then(parse_level).unwrap_or(Level::INFO),
        use_json: json.and_then(|v| v.parse::<bool>().ok()).unwrap_or(false),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("Debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" info "), Some(Level::INFO));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_level("fatal"), None);
        assert_eq!(parse_level(""), None);
    }

    #[test]
    fn test_presets() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);

        let config = LoggingConfig::production();
        assert!(config.use_json);
        assert!(config.include_location);

        let config = LoggingConfig::development();
        assert_eq!(config.level, Level::DEBUG);
        assert!(!config.use_json);
    }

    #[test]
    fn test_config_from_vars() {
        let config = config_from_vars(Some("debug"), Some("true"));
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);

        let config = config_from_vars(Some("verbose"), Some("yes"));
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);

        let config = config_from_vars(None, None);
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LoggingConfig::with_level(Level::WARN));
        init_default();
        with_level("debug");
    }
}
