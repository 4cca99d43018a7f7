//! Per-type and per-instance loggers
//!
//! A [`Logger`] is bound to a severity threshold and a [`LogSink`]. Each one
//! owns a private `tracing` dispatcher whose fmt subscriber writes to the
//! sink, so pipeline output never depends on (or leaks into) the host's
//! global subscriber.
//!
//! Settings are layered: explicit constructor flags, then environment
//! overrides, then template settings, then the hard default of `info` on
//! standard output. See [`LogSettings::overlay`].

mod severity;
mod sink;

pub use severity::Severity;
pub use sink::{LogSink, SharedStream};

use sink::SinkTarget;
use tracing::{Dispatch, Level};

/// Level and sink as declared on a template, an instance, or the environment.
///
/// `None` fields are unset and defer to the next layer down.
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub level: Option<Severity>,
    pub sink: Option<LogSink>,
}

impl LogSettings {
    pub fn new(level: Severity, sink: LogSink) -> Self {
        Self {
            level: Some(level),
            sink: Some(sink),
        }
    }

    /// Fills unset fields of `self` from `lower`; set fields win.
    pub fn overlay(&self, lower: &LogSettings) -> LogSettings {
        LogSettings {
            level: self.level.or(lower.level),
            sink: self.sink.clone().or_else(|| lower.sink.clone()),
        }
    }

    pub fn effective_level(&self) -> Severity {
        self.level.unwrap_or_default()
    }

    pub fn effective_sink(&self) -> LogSink {
        self.sink.clone().unwrap_or_default()
    }
}

/// A severity-filtered logger writing to one sink
#[derive(Debug, Clone)]
pub struct Logger {
    progname: String,
    threshold: Severity,
    sink: LogSink,
    dispatch: Dispatch,
}

impl Logger {
    /// Builds a logger, falling back to standard output if the sink
    /// cannot be opened.
    pub fn new(progname: impl Into<String>, threshold: Severity, sink: LogSink) -> Self {
        let progname = progname.into();
        match Self::try_new(progname.clone(), threshold, sink) {
            Ok(logger) => logger,
            Err(err) => {
                tracing::warn!(
                    progname = %progname,
                    error = %err,
                    "Log sink unavailable, falling back to stdout"
                );
                Self::with_target(progname, threshold, LogSink::Stdout, SinkTarget::Stdout)
            }
        }
    }

    pub fn try_new(
        progname: impl Into<String>,
        threshold: Severity,
        sink: LogSink,
    ) -> std::io::Result<Self> {
        let target = sink.open()?;
        Ok(Self::with_target(progname.into(), threshold, sink, target))
    }

    /// Builds a logger from resolved settings
    pub fn from_settings(progname: impl Into<String>, settings: &LogSettings) -> Self {
        Self::new(
            progname,
            settings.effective_level(),
            settings.effective_sink(),
        )
    }

    fn with_target(progname: String, threshold: Severity, sink: LogSink, target: SinkTarget) -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(target)
            .with_ansi(false)
            .with_target(false)
            .with_max_level(Level::TRACE)
            .finish();

        Self {
            progname,
            threshold,
            sink,
            dispatch: Dispatch::new(subscriber),
        }
    }

    pub fn progname(&self) -> &str {
        &self.progname
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity.passes(self.threshold)
    }

    /// Emits `message` if `severity` passes the threshold. Never fails.
    pub fn log(&self, severity: Severity, message: &str) {
        if !self.enabled(severity) {
            return;
        }

        let progname = self.progname.as_str();
        tracing::dispatcher::with_default(&self.dispatch, || match severity.tracing_level() {
            Level::TRACE => tracing::trace!(progname, severity = %severity, "{}", message),
            Level::DEBUG => tracing::debug!(progname, severity = %severity, "{}", message),
            Level::INFO => tracing::info!(progname, severity = %severity, "{}", message),
            Level::WARN => tracing::warn!(progname, severity = %severity, "{}", message),
            _ => tracing::error!(progname, severity = %severity, "{}", message),
        });
    }

    pub fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Severity::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    pub fn fatal(&self, message: &str) {
        self.log(Severity::Fatal, message);
    }
}

/// Program name attached to every record of a pipeline type's loggers
pub fn progname_for(type_name: &str) -> String {
    format!("<phaseline/{}>", type_name)
}
