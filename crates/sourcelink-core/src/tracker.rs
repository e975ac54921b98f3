//! Contracts for the external collaborators the engine drives: persistence,
//! the issue tracker (which also hosts the user directory, notes and
//! history), the optional product version matrix, and the event bus.

use crate::error::CoreError;
use crate::model::{
    BranchMapping, Changeset, IssueId, IssueRecord, LinkDiff, ProjectId, RepoId, Repository,
    UserId, VersionId, VersionRow,
};
use std::collections::{BTreeMap, HashMap};

/// History entry kinds emitted for issue link changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    ChangesetAttached,
    ChangesetRemoved,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChangesetAttached => "changeset_attached",
            Self::ChangesetRemoved => "changeset_removed",
        }
    }
}

/// The slice of persistence the engine consumes.
pub trait Storage {
    /// Load the distinct repositories referenced by a batch. Unknown
    /// references are simply absent from the result.
    fn repositories_for(
        &self,
        changesets: &[Changeset],
    ) -> Result<HashMap<RepoId, Repository>, CoreError>;

    /// Persist a changeset (assigning its id on first save) and return the
    /// issue-link diff against the previously-persisted state.
    fn save_changeset(&mut self, changeset: &mut Changeset) -> Result<LinkDiff, CoreError>;

    /// All branch mappings for a repository, keyed by branch.
    fn branch_mappings(&self, repo_id: RepoId)
        -> Result<BTreeMap<String, BranchMapping>, CoreError>;

    /// The explicit VCS-username-to-user associations.
    fn vcs_user_map(&self) -> Result<HashMap<String, UserId>, CoreError>;
}

/// The issue tracker contract: issue state, access checks, the user
/// directory, project versions, notes and history.
pub trait IssueTracker {
    fn issue_exists(&self, issue_id: IssueId) -> bool;

    fn issue_get(&self, issue_id: IssueId) -> Result<IssueRecord, CoreError>;

    /// Persist field changes. The tracker sends its own update notification.
    fn issue_update(&mut self, record: &IssueRecord) -> Result<(), CoreError>;

    /// Bulk cache warm ahead of the decision loop; no observable effect.
    fn precache_issues(&mut self, _issue_ids: &[IssueId]) -> Result<(), CoreError> {
        Ok(())
    }

    /// Bump the issue's last-activity timestamp.
    fn touch_issue(&mut self, issue_id: IssueId) -> Result<(), CoreError>;

    fn has_access_level(&self, threshold: i32, issue_id: IssueId, user_id: UserId) -> bool;

    fn user_id_by_email(&self, email: &str) -> Option<UserId>;
    fn user_id_by_realname(&self, name: &str) -> Option<UserId>;
    fn user_id_by_login(&self, name: &str) -> Option<UserId>;

    fn project_versions(&self, project_id: ProjectId) -> Result<Vec<VersionRow>, CoreError>;

    /// Post a note. `notify = false` suppresses the note's own notification
    /// (used when a subsequent issue update notifies anyway).
    fn add_note(
        &mut self,
        issue_id: IssueId,
        user_id: UserId,
        text: &str,
        private: bool,
        notify: bool,
    ) -> Result<(), CoreError>;

    fn append_history(
        &mut self,
        issue_id: IssueId,
        user_id: UserId,
        kind: HistoryKind,
        old_value: &str,
        new_value: &str,
    ) -> Result<(), CoreError>;

    /// The product version matrix, when this deployment provides one.
    fn version_matrix(&mut self) -> Option<&mut dyn VersionMatrix> {
        None
    }
}

/// Narrow contract of the third-party product matrix subsystem: set one
/// version's status entry on an issue, only if the entry exists.
pub trait VersionMatrix {
    fn set_version_status(
        &mut self,
        issue_id: IssueId,
        version_id: VersionId,
        status: i32,
    ) -> Result<(), CoreError>;
}

/// Post-processing notifications for other subsystems.
pub trait EventSink {
    /// The full processed batch.
    fn commits_processed(&mut self, changesets: &[Changeset]);

    /// The fixed-issue map: issue id to the index of the deciding changeset.
    fn issues_fixed(&mut self, changesets: &[Changeset], fixed: &BTreeMap<IssueId, usize>);
}
