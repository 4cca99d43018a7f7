//! The fixed lifecycle phases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five lifecycle stages, in execution order.
///
/// The set is closed: templates and artifact stores key on it and never
/// grow new phases at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    BeforeBuild,
    Build,
    AfterBuild,
    Teardown,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Setup,
        Phase::BeforeBuild,
        Phase::Build,
        Phase::AfterBuild,
        Phase::Teardown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::BeforeBuild => "before_build",
            Phase::Build => "build",
            Phase::AfterBuild => "after_build",
            Phase::Teardown => "teardown",
        }
    }

    /// Phases that run inside the `build_root` working directory
    pub fn is_build_scoped(&self) -> bool {
        matches!(self, Phase::BeforeBuild | Phase::Build | Phase::AfterBuild)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("Unknown phase: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_fixed() {
        let names: Vec<&str> = Phase::ALL.iter().map(Phase::as_str).collect();
        assert_eq!(
            names,
            vec!["setup", "before_build", "build", "after_build", "teardown"]
        );
        assert!(Phase::Setup < Phase::Teardown);
    }

    #[test]
    fn test_build_scoped() {
        assert!(!Phase::Setup.is_build_scoped());
        assert!(Phase::BeforeBuild.is_build_scoped());
        assert!(Phase::Build.is_build_scoped());
        assert!(Phase::AfterBuild.is_build_scoped());
        assert!(!Phase::Teardown.is_build_scoped());
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!("after_build".parse::<Phase>(), Ok(Phase::AfterBuild));
        assert!("deploy".parse::<Phase>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Phase::BeforeBuild).unwrap();
        assert_eq!(json, "\"before_build\"");
    }
}
