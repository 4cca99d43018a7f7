use serde::{Deserialize, Serialize};

/// Which registered capabilities a pipeline type attaches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "names")]
pub enum CapabilityPolicy {
    #[default]
    None,
    All,
    /// Only capabilities whose registered name matches an entry
    Only(Vec<String>),
}

impl CapabilityPolicy {
    /// Whether a capability registered as `name` is selected.
    ///
    /// Entries match on their simple name: `"release::Dummy"` and `"Dummy"`
    /// both select a capability registered as `Dummy`.
    pub fn admits(&self, name: &str) -> bool {
        match self {
            CapabilityPolicy::None => false,
            CapabilityPolicy::All => true,
            CapabilityPolicy::Only(entries) => {
                entries.iter().any(|entry| simple_name(entry) == name)
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CapabilityPolicy::None)
    }
}

fn simple_name(entry: &str) -> &str {
    entry.rsplit("::").next().unwrap_or(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_admits_nothing() {
        assert!(!CapabilityPolicy::None.admits("Dummy"));
        assert!(CapabilityPolicy::None.is_none());
    }

    #[test]
    fn test_all_admits_everything() {
        assert!(CapabilityPolicy::All.admits("Dummy"));
        assert!(CapabilityPolicy::All.admits("Failer"));
    }

    #[test]
    fn test_only_matches_exact_simple_name() {
        let policy = CapabilityPolicy::Only(vec!["Dummy".to_string()]);
        assert!(policy.admits("Dummy"));
        assert!(!policy.admits("Failer"));
        assert!(!policy.admits("DummyExtra"));
        assert!(!policy.admits("dummy"));
    }

    #[test]
    fn test_only_accepts_qualified_entries() {
        let policy = CapabilityPolicy::Only(vec!["release::common::Credentials".to_string()]);
        assert!(policy.admits("Credentials"));
        assert!(!policy.admits("common"));
    }

    #[test]
    fn test_serde_shape() {
        let policy = CapabilityPolicy::Only(vec!["Dummy".to_string()]);
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "only", "names": ["Dummy"]}));
    }
}
