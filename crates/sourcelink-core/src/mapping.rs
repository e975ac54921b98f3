use crate::error::CoreError;
use crate::model::{BranchMapping, IssueId, MappingStrategy, ProjectId, VersionId, VersionRow};
use crate::tracker::IssueTracker;
use regex::Regex;
use semver::Version;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Resolves branch mappings to version labels, caching each project's
/// version list and its per-strategy ordered view for the lifetime of one
/// batch. Owned by the engine; never shared across invocations.
#[derive(Debug, Default)]
pub struct VersionResolver {
    versions: HashMap<ProjectId, Vec<VersionRow>>,
    ordered: HashMap<(ProjectId, MappingStrategy), Vec<VersionRow>>,
}

impl VersionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a mapping to a version label for the given issue.
    /// An empty string means "no match".
    pub fn resolve(
        &mut self,
        mapping: &BranchMapping,
        issue_id: IssueId,
        tracker: &dyn IssueTracker,
    ) -> Result<String, CoreError> {
        if mapping.strategy == MappingStrategy::Explicit {
            return Ok(mapping.version.clone());
        }

        let project_id = tracker.issue_get(issue_id)?.project_id;
        if !self.versions.contains_key(&project_id) {
            let rows = tracker.project_versions(project_id)?;
            self.versions.insert(project_id, rows);
        }
        if self.versions[&project_id].is_empty() {
            return Ok(String::new());
        }

        let key = (project_id, mapping.strategy);
        if !self.ordered.contains_key(&key) {
            let mut view = self.versions[&project_id].clone();
            match mapping.strategy {
                MappingStrategy::Nearest => view.sort_by(|a, b| a.date_order.cmp(&b.date_order)),
                MappingStrategy::Farthest => view.sort_by(|a, b| b.date_order.cmp(&a.date_order)),
                MappingStrategy::First => view.sort_by(|a, b| cmp_labels(&a.label, &b.label)),
                MappingStrategy::Last => view.sort_by(|a, b| cmp_labels(&b.label, &a.label)),
                MappingStrategy::Explicit => {}
            }
            self.ordered.insert(key, view);
        }
        let view = &self.ordered[&key];

        match &mapping.pattern {
            None => Ok(view[0].label.clone()),
            Some(raw) => {
                let filter = Regex::new(raw).map_err(|source| CoreError::InvalidPattern {
                    name: "mapping filter",
                    source,
                })?;
                Ok(view
                    .iter()
                    .find(|row| filter.is_match(&row.label))
                    .map(|row| row.label.clone())
                    .unwrap_or_default())
            }
        }
    }

    /// Resolve a mapping to a product version id; 0 means "no match".
    ///
    /// Only the Explicit strategy operates in product mode — the others
    /// always return 0. The asymmetry is deliberate and load-bearing.
    pub fn resolve_product(&self, mapping: &BranchMapping) -> VersionId {
        if mapping.strategy == MappingStrategy::Explicit {
            mapping.pvm_version_id
        } else {
            0
        }
    }
}

/// Compare version labels semantically when both parse (leniently), falling
/// back to plain string order otherwise.
pub(crate) fn cmp_labels(a: &str, b: &str) -> Ordering {
    match (lenient_version(a), lenient_version(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Parse labels like `1.0`, `v2.1` or `1.4-rc1` by padding the version core
/// out to three components before handing it to semver.
fn lenient_version(label: &str) -> Option<Version> {
    let trimmed = label.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }
    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(core_end);
    let missing = 3usize.saturating_sub(core.split('.').count());
    if missing == 0 {
        return None;
    }
    let padded = format!("{}{}{}", core, ".0".repeat(missing), rest);
    Version::parse(&padded).ok()
}
