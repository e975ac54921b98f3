//! A file-backed issue tracker implementing the core's tracker contracts.
//!
//! This is the collaborator the CLI and the integration tests run against:
//! users, issues (with an optional per-version status matrix), project
//! versions, notes and history live in JSON tables beside the store's own.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sourcelink_core::error::CoreError;
use sourcelink_core::model::{
    IssueId, IssueRecord, ProjectId, UserId, VersionId, VersionRow,
};
use sourcelink_core::tracker::{HistoryKind, IssueTracker, VersionMatrix};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const USERS: &str = "users.json";
const ISSUES: &str = "issues.json";
const VERSIONS: &str = "versions.json";
const NOTES: &str = "notes.json";
const HISTORY: &str = "history.json";

const SOURCE_TAG: &str = "sourcelink";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerUser {
    pub id: UserId,
    pub login: String,
    #[serde(default)]
    pub realname: String,
    #[serde(default)]
    pub email: String,
    pub access_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerIssue {
    pub id: IssueId,
    pub project_id: ProjectId,
    pub status: i32,
    pub resolution: i32,
    #[serde(default)]
    pub handler_id: UserId,
    #[serde(default)]
    pub fixed_in_version: String,
    pub last_updated: DateTime<Utc>,
    /// Per-version status entries for product-matrix deployments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub version_status: BTreeMap<VersionId, i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerVersion {
    pub id: VersionId,
    pub project_id: ProjectId,
    pub label: String,
    pub date_order: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerNote {
    pub issue_id: IssueId,
    pub user_id: UserId,
    pub text: String,
    pub private: bool,
    /// Whether the note sent its own notification when posted.
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub issue_id: IssueId,
    pub user_id: UserId,
    pub kind: String,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
    pub source: String,
}

pub struct LocalTracker {
    dir: PathBuf,
    users: Vec<TrackerUser>,
    issues: Vec<TrackerIssue>,
    versions: Vec<TrackerVersion>,
    notes: Vec<TrackerNote>,
    history: Vec<HistoryEntry>,
}

impl LocalTracker {
    /// Open the tracker tables inside an existing data directory.
    /// Missing tables read as empty.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        Ok(Self {
            users: read_table(&dir, USERS)?,
            issues: read_table(&dir, ISSUES)?,
            versions: read_table(&dir, VERSIONS)?,
            notes: read_table(&dir, NOTES)?,
            history: read_table(&dir, HISTORY)?,
            dir,
        })
    }

    pub fn insert_user(&mut self, user: TrackerUser) -> Result<(), StoreError> {
        self.users.retain(|u| u.id != user.id);
        self.users.push(user);
        self.write_table(USERS, &self.users)
    }

    pub fn insert_issue(&mut self, issue: TrackerIssue) -> Result<(), StoreError> {
        self.issues.retain(|i| i.id != issue.id);
        self.issues.push(issue);
        self.write_table(ISSUES, &self.issues)
    }

    pub fn insert_version(&mut self, version: TrackerVersion) -> Result<(), StoreError> {
        self.versions.retain(|v| v.id != version.id);
        self.versions.push(version);
        self.write_table(VERSIONS, &self.versions)
    }

    pub fn issue(&self, issue_id: IssueId) -> Option<&TrackerIssue> {
        self.issues.iter().find(|i| i.id == issue_id)
    }

    pub fn notes_for(&self, issue_id: IssueId) -> Vec<&TrackerNote> {
        self.notes.iter().filter(|n| n.issue_id == issue_id).collect()
    }

    pub fn history_for(&self, issue_id: IssueId) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|h| h.issue_id == issue_id).collect()
    }

    fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(rows)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.dir.join(name))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn issue_mut(&mut self, issue_id: IssueId) -> Result<&mut TrackerIssue, CoreError> {
        self.issues
            .iter_mut()
            .find(|i| i.id == issue_id)
            .ok_or(CoreError::IssueNotFound(issue_id))
    }
}

fn read_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>, StoreError> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&data)?)
}

fn into_core(err: StoreError) -> CoreError {
    CoreError::Tracker(err.to_string())
}

impl IssueTracker for LocalTracker {
    fn issue_exists(&self, issue_id: IssueId) -> bool {
        self.issues.iter().any(|i| i.id == issue_id)
    }

    fn issue_get(&self, issue_id: IssueId) -> Result<IssueRecord, CoreError> {
        let issue = self
            .issues
            .iter()
            .find(|i| i.id == issue_id)
            .ok_or(CoreError::IssueNotFound(issue_id))?;
        Ok(IssueRecord {
            id: issue.id,
            project_id: issue.project_id,
            status: issue.status,
            resolution: issue.resolution,
            handler_id: issue.handler_id,
            fixed_in_version: issue.fixed_in_version.clone(),
        })
    }

    fn issue_update(&mut self, record: &IssueRecord) -> Result<(), CoreError> {
        let issue = self.issue_mut(record.id)?;
        issue.status = record.status;
        issue.resolution = record.resolution;
        issue.handler_id = record.handler_id;
        issue.fixed_in_version = record.fixed_in_version.clone();
        issue.last_updated = Utc::now();
        self.write_table(ISSUES, &self.issues).map_err(into_core)
    }

    fn touch_issue(&mut self, issue_id: IssueId) -> Result<(), CoreError> {
        let issue = self.issue_mut(issue_id)?;
        issue.last_updated = Utc::now();
        self.write_table(ISSUES, &self.issues).map_err(into_core)
    }

    fn has_access_level(&self, threshold: i32, _issue_id: IssueId, user_id: UserId) -> bool {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .is_some_and(|u| u.access_level >= threshold)
    }

    fn user_id_by_email(&self, email: &str) -> Option<UserId> {
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.id)
    }

    fn user_id_by_realname(&self, name: &str) -> Option<UserId> {
        self.users.iter().find(|u| u.realname == name).map(|u| u.id)
    }

    fn user_id_by_login(&self, name: &str) -> Option<UserId> {
        self.users.iter().find(|u| u.login == name).map(|u| u.id)
    }

    fn project_versions(&self, project_id: ProjectId) -> Result<Vec<VersionRow>, CoreError> {
        Ok(self
            .versions
            .iter()
            .filter(|v| v.project_id == project_id)
            .map(|v| VersionRow {
                id: v.id,
                label: v.label.clone(),
                date_order: v.date_order,
            })
            .collect())
    }

    fn add_note(
        &mut self,
        issue_id: IssueId,
        user_id: UserId,
        text: &str,
        private: bool,
        notify: bool,
    ) -> Result<(), CoreError> {
        self.notes.push(TrackerNote {
            issue_id,
            user_id,
            text: text.to_string(),
            private,
            notified: notify,
            created_at: Utc::now(),
        });
        self.write_table(NOTES, &self.notes).map_err(into_core)
    }

    fn append_history(
        &mut self,
        issue_id: IssueId,
        user_id: UserId,
        kind: HistoryKind,
        old_value: &str,
        new_value: &str,
    ) -> Result<(), CoreError> {
        self.history.push(HistoryEntry {
            issue_id,
            user_id,
            kind: kind.as_str().to_string(),
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
            source: SOURCE_TAG.to_string(),
        });
        self.write_table(HISTORY, &self.history).map_err(into_core)
    }

    fn version_matrix(&mut self) -> Option<&mut dyn VersionMatrix> {
        Some(self)
    }
}

impl VersionMatrix for LocalTracker {
    fn set_version_status(
        &mut self,
        issue_id: IssueId,
        version_id: VersionId,
        status: i32,
    ) -> Result<(), CoreError> {
        let issue = self.issue_mut(issue_id)?;
        // only versions already tracked on the issue get an entry
        if issue.version_status.contains_key(&version_id) {
            issue.version_status.insert(version_id, status);
            self.write_table(ISSUES, &self.issues).map_err(into_core)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_tracker() -> (tempfile::TempDir, LocalTracker) {
        let dir = tempfile::tempdir().unwrap();
        let tracker = LocalTracker::open(dir.path()).unwrap();
        (dir, tracker)
    }

    fn sample_user(id: UserId, login: &str, access_level: i32) -> TrackerUser {
        TrackerUser {
            id,
            login: login.into(),
            realname: format!("{} Realname", login),
            email: format!("{}@example.com", login),
            access_level,
        }
    }

    fn sample_issue(id: IssueId) -> TrackerIssue {
        TrackerIssue {
            id,
            project_id: 1,
            status: 10,
            resolution: 10,
            handler_id: 0,
            fixed_in_version: String::new(),
            last_updated: Utc::now(),
            version_status: BTreeMap::new(),
        }
    }

    #[test]
    fn missing_tables_read_as_empty() {
        let (_dir, tracker) = temp_tracker();
        assert!(!tracker.issue_exists(1));
        assert!(tracker.project_versions(1).unwrap().is_empty());
    }

    #[test]
    fn issue_get_and_update_round_trip() {
        let (dir, mut tracker) = temp_tracker();
        tracker.insert_issue(sample_issue(42)).unwrap();

        let mut record = tracker.issue_get(42).unwrap();
        record.status = 80;
        record.fixed_in_version = "1.2".into();
        tracker.issue_update(&record).unwrap();

        let reopened = LocalTracker::open(dir.path()).unwrap();
        let issue = reopened.issue(42).unwrap();
        assert_eq!(issue.status, 80);
        assert_eq!(issue.fixed_in_version, "1.2");
    }

    #[test]
    fn issue_get_missing_is_an_error() {
        let (_dir, tracker) = temp_tracker();
        assert!(matches!(
            tracker.issue_get(99),
            Err(CoreError::IssueNotFound(99))
        ));
    }

    #[test]
    fn access_level_check() {
        let (_dir, mut tracker) = temp_tracker();
        tracker.insert_user(sample_user(5, "alice", 55)).unwrap();
        assert!(tracker.has_access_level(55, 1, 5));
        assert!(!tracker.has_access_level(70, 1, 5));
        assert!(!tracker.has_access_level(10, 1, 99));
    }

    #[test]
    fn directory_lookups() {
        let (_dir, mut tracker) = temp_tracker();
        tracker.insert_user(sample_user(5, "alice", 55)).unwrap();

        assert_eq!(tracker.user_id_by_email("ALICE@example.com"), Some(5));
        assert_eq!(tracker.user_id_by_realname("alice Realname"), Some(5));
        assert_eq!(tracker.user_id_by_login("alice"), Some(5));
        assert_eq!(tracker.user_id_by_login("bob"), None);
    }

    #[test]
    fn notes_and_history_accumulate() {
        let (_dir, mut tracker) = temp_tracker();
        tracker.insert_issue(sample_issue(42)).unwrap();

        tracker.add_note(42, 5, "fixed upstream", false, true).unwrap();
        tracker
            .append_history(42, 5, HistoryKind::ChangesetAttached, "", "repo r100")
            .unwrap();

        assert_eq!(tracker.notes_for(42).len(), 1);
        assert!(tracker.notes_for(42)[0].notified);
        let history = tracker.history_for(42);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, "changeset_attached");
        assert_eq!(history[0].source, "sourcelink");
    }

    #[test]
    fn matrix_updates_only_existing_entries() {
        let (_dir, mut tracker) = temp_tracker();
        let mut issue = sample_issue(42);
        issue.version_status.insert(7, 10);
        tracker.insert_issue(issue).unwrap();

        tracker.set_version_status(42, 7, 85).unwrap();
        tracker.set_version_status(42, 8, 85).unwrap();

        let issue = tracker.issue(42).unwrap();
        assert_eq!(issue.version_status.get(&7), Some(&85));
        assert_eq!(issue.version_status.get(&8), None);
    }

    #[test]
    fn touch_bumps_last_updated() {
        let (_dir, mut tracker) = temp_tracker();
        let mut issue = sample_issue(42);
        issue.last_updated = DateTime::<Utc>::UNIX_EPOCH;
        tracker.insert_issue(issue).unwrap();

        tracker.touch_issue(42).unwrap();
        assert!(tracker.issue(42).unwrap().last_updated > DateTime::<Utc>::UNIX_EPOCH);
    }
}
