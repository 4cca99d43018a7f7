use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Level;

/// Ordered message severity, doubling as a logger threshold.
///
/// `Unknown` is the lowest class and catches any identifier that does not
/// parse. `None` is only meaningful as a threshold: it silences everything.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Unknown,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    None,
}

impl Severity {
    /// Parses a severity identifier, case-insensitively.
    ///
    /// Never fails: unrecognized input becomes `Unknown`.
    ///
    /// ```
    /// use phaseline::Severity;
    ///
    /// assert_eq!(Severity::parse("WARN"), Severity::Warn);
    /// assert_eq!(Severity::parse("warning"), Severity::Warn);
    /// assert_eq!(Severity::parse("loud"), Severity::Unknown);
    /// ```
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "debug" => Severity::Debug,
            "info" => Severity::Info,
            "warn" | "warning" => Severity::Warn,
            "error" => Severity::Error,
            "fatal" => Severity::Fatal,
            "none" => Severity::None,
            _ => Severity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "unknown",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
            Severity::None => "none",
        }
    }

    /// Whether a message at this severity passes `threshold`
    pub fn passes(self, threshold: Severity) -> bool {
        threshold != Severity::None && self != Severity::None && self >= threshold
    }

    pub(crate) fn tracing_level(self) -> Level {
        match self {
            Severity::Unknown => Level::TRACE,
            Severity::Debug => Level::DEBUG,
            Severity::Info => Level::INFO,
            Severity::Warn => Level::WARN,
            Severity::Error | Severity::Fatal | Severity::None => Level::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        Severity::parse(value)
    }
}
