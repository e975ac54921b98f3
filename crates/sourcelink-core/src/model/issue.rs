use crate::model::{IssueId, ProjectId, UserId, VersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The slice of an issue the resolution procedure reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueRecord {
    pub id: IssueId,
    pub project_id: ProjectId,
    pub status: i32,
    pub resolution: i32,
    /// The user assigned responsibility for the issue; 0 = unassigned.
    pub handler_id: UserId,
    #[serde(default)]
    pub fixed_in_version: String,
}

/// One project version as reported by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionRow {
    pub id: VersionId,
    pub label: String,
    /// Release date ordering used by the Nearest/Farthest strategies.
    pub date_order: DateTime<Utc>,
}
