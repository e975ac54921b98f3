use crate::model::file_change::FileChange;
use crate::model::{ChangesetId, IssueId, RepoId, UserId};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name and email as recorded by the VCS.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Signature {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// One recorded commit, with its file changes and linked issue ids.
///
/// `issues` is the current link set; `prior_issues` is a shadow copy of the
/// previously-persisted set, refreshed on every save so repeated saves diff
/// to nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Changeset {
    pub id: ChangesetId,
    pub repo_id: RepoId,
    pub revision: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub branch: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub author: Signature,
    #[serde(default)]
    pub committer: Signature,
    /// Resolved user identities; 0 = unresolved.
    #[serde(default)]
    pub author_id: UserId,
    #[serde(default)]
    pub committer_id: UserId,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IssueId>,
    #[serde(skip)]
    pub prior_issues: Vec<IssueId>,
}

impl Changeset {
    pub fn new(repo_id: RepoId, revision: impl Into<String>) -> Self {
        Self {
            id: 0,
            repo_id,
            revision: revision.into(),
            parent: String::new(),
            branch: String::new(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            author: Signature::default(),
            committer: Signature::default(),
            author_id: 0,
            committer_id: 0,
            message: String::new(),
            files: Vec::new(),
            issues: Vec::new(),
            prior_issues: Vec::new(),
        }
    }

    /// Diff the current link set against the previously-persisted one.
    pub fn link_diff(&self) -> LinkDiff {
        LinkDiff::between(&self.prior_issues, &self.issues)
    }

    /// Drop duplicate issue links, keeping first-seen order.
    pub fn normalize_links(&mut self) {
        dedup_in_place(&mut self.issues);
        dedup_in_place(&mut self.prior_issues);
    }

    /// The user attributed to link attach/remove audit entries:
    /// committer when resolved, author otherwise.
    pub fn audit_user_id(&self) -> UserId {
        if self.committer_id > 0 {
            self.committer_id
        } else if self.author_id > 0 {
            self.author_id
        } else {
            0
        }
    }
}

fn dedup_in_place(ids: &mut Vec<IssueId>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
}

/// Issue links gained and lost relative to the persisted state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkDiff {
    pub added: Vec<IssueId>,
    pub removed: Vec<IssueId>,
}

impl LinkDiff {
    pub fn between(prior: &[IssueId], current: &[IssueId]) -> Self {
        Self {
            added: current.iter().filter(|id| !prior.contains(id)).copied().collect(),
            removed: prior.iter().filter(|id| !current.contains(id)).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Parse a commit timestamp from ingestion input, assuming UTC when no
/// offset is given. A malformed value is recoverable: it is logged and
/// replaced by the Unix epoch so the batch can continue.
pub fn parse_commit_timestamp(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }
    warn!(timestamp = raw, "malformed commit timestamp, substituting epoch");
    DateTime::<Utc>::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_diff_additions_and_removals() {
        let mut cs = Changeset::new(1, "abc123");
        cs.prior_issues = vec![1, 2, 3];
        cs.issues = vec![2, 3, 4];
        let diff = cs.link_diff();
        assert_eq!(diff.added, vec![4]);
        assert_eq!(diff.removed, vec![1]);
    }

    #[test]
    fn link_diff_identical_sets_is_empty() {
        let mut cs = Changeset::new(1, "abc123");
        cs.prior_issues = vec![5, 6];
        cs.issues = vec![5, 6];
        assert!(cs.link_diff().is_empty());
    }

    #[test]
    fn normalize_links_keeps_first_seen_order() {
        let mut cs = Changeset::new(1, "abc123");
        cs.issues = vec![3, 1, 3, 2, 1];
        cs.normalize_links();
        assert_eq!(cs.issues, vec![3, 1, 2]);
    }

    #[test]
    fn audit_user_prefers_committer() {
        let mut cs = Changeset::new(1, "abc123");
        assert_eq!(cs.audit_user_id(), 0);
        cs.author_id = 7;
        assert_eq!(cs.audit_user_id(), 7);
        cs.committer_id = 9;
        assert_eq!(cs.audit_user_id(), 9);
    }

    #[test]
    fn parse_timestamp_rfc3339() {
        let ts = parse_commit_timestamp("2026-01-02T10:30:00+02:00");
        assert_eq!(ts.to_rfc3339(), "2026-01-02T08:30:00+00:00");
    }

    #[test]
    fn parse_timestamp_bare_datetime_is_utc() {
        let ts = parse_commit_timestamp("2026-01-02 10:30:00");
        assert_eq!(ts.to_rfc3339(), "2026-01-02T10:30:00+00:00");
    }

    #[test]
    fn parse_timestamp_malformed_falls_back_to_epoch() {
        let ts = parse_commit_timestamp("next tuesday");
        assert_eq!(ts, DateTime::<Utc>::UNIX_EPOCH);
    }
}
