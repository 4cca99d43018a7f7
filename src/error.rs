//! Failure taxonomy for pipeline definition, construction and runs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the engine raises.
///
/// `Flag`, `Build` and `Artifact` are the failures step logic sees most
/// often. `Artifact` is a specialization of `Build`; use
/// [`PipelineError::is_build_failure`] to treat them uniformly.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A guarded flag read found no value
    #[error("{0}")]
    Flag(String),

    /// Explicit abort, or required flags missing at construction
    #[error("{0}")]
    Build(String),

    /// A guarded artifact read found no value
    #[error("{0}")]
    Artifact(String),

    /// No type- or instance-level operation registered under this name
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    /// Pipeline type lookup failed
    #[error("Pipeline type not found: {0}")]
    UnknownType(String),

    /// Pipeline type already defined in the catalog
    #[error("Pipeline type already defined: {0}")]
    DuplicateType(String),

    /// Entering or leaving the build root failed
    #[error("Failed to change working directory to {}: {source}", path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Arbitrary failure bubbled up from caller step logic
    #[error(transparent)]
    Step(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    pub fn flag(message: impl Into<String>) -> Self {
        Self::Flag(message.into())
    }

    pub fn artifact(message: impl Into<String>) -> Self {
        Self::Artifact(message.into())
    }

    /// True for build failures and their specializations.
    ///
    /// Only `Flag` sits outside the build-failure family.
    pub fn is_build_failure(&self) -> bool {
        !matches!(self, Self::Flag(_))
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
