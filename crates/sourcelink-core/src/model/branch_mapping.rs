use crate::model::{RepoId, VersionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a branch resolves to a target version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStrategy {
    /// The mapping's stored version label (or product version id), verbatim.
    Explicit,
    /// Earliest version by release date ordering.
    Nearest,
    /// Latest version by release date ordering.
    Farthest,
    /// Lowest version by semantic version ordering.
    First,
    /// Highest version by semantic version ordering.
    Last,
}

impl MappingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Nearest => "nearest",
            Self::Farthest => "farthest",
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

impl fmt::Display for MappingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "nearest" => Ok(Self::Nearest),
            "farthest" => Ok(Self::Farthest),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(format!("unknown mapping strategy: {}", other)),
        }
    }
}

/// A rule assigning a target version to fixes committed on one branch.
/// At most one mapping exists per (repository, branch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BranchMapping {
    pub repo_id: RepoId,
    pub branch: String,
    pub strategy: MappingStrategy,
    /// Explicit version label; ignored by the other strategies.
    #[serde(default)]
    pub version: String,
    /// Explicit product version id; 0 = none.
    #[serde(default)]
    pub pvm_version_id: VersionId,
    /// Optional filter: only version labels matching this pattern qualify.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl BranchMapping {
    pub fn new(repo_id: RepoId, branch: impl Into<String>, strategy: MappingStrategy) -> Self {
        Self {
            repo_id,
            branch: branch.into(),
            strategy,
            version: String::new(),
            pvm_version_id: 0,
            pattern: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_round_trips_through_str() {
        for strategy in [
            MappingStrategy::Explicit,
            MappingStrategy::Nearest,
            MappingStrategy::Farthest,
            MappingStrategy::First,
            MappingStrategy::Last,
        ] {
            assert_eq!(strategy.as_str().parse::<MappingStrategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn strategy_parse_rejects_unknown() {
        assert!("sideways".parse::<MappingStrategy>().is_err());
    }
}
