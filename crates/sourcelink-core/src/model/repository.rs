use crate::model::branch_mapping::BranchMapping;
use crate::model::RepoId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A tracked source control repository.
///
/// `info` holds per-VCS extension data as a structured scalar map.
/// `branches` and `mappings` are store-loaded caches, empty until filled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub id: RepoId,
    pub vcs_type: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub info: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: BTreeMap<String, BranchMapping>,
}

impl Repository {
    pub fn new(vcs_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            vcs_type: vcs_type.into(),
            name: name.into(),
            url: String::new(),
            info: HashMap::new(),
            branches: Vec::new(),
            mappings: BTreeMap::new(),
        }
    }
}
