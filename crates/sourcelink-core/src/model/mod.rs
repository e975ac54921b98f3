pub mod branch_mapping;
pub mod changeset;
pub mod file_change;
pub mod issue;
pub mod repository;
pub mod user;

pub use branch_mapping::{BranchMapping, MappingStrategy};
pub use changeset::{parse_commit_timestamp, Changeset, LinkDiff, Signature};
pub use file_change::{FileAction, FileChange};
pub use issue::{IssueRecord, VersionRow};
pub use repository::Repository;
pub use user::UserAssociation;

/// Row identifiers. Zero means "not yet persisted" (or, for user ids,
/// "unresolved") — the sentinel is part of the storage format.
pub type RepoId = i64;
pub type ChangesetId = i64;
pub type IssueId = i64;
pub type UserId = i64;
pub type ProjectId = i64;
pub type VersionId = i64;
