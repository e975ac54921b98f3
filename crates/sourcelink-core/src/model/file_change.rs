use crate::model::ChangesetId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used to encode renames as `old → new` in a single path field.
pub const RENAME_SEPARATOR: &str = " → ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileAction {
    #[serde(rename = "add")]
    Added,
    #[serde(rename = "mod")]
    Modified,
    #[serde(rename = "mv")]
    Renamed,
    #[serde(rename = "rm")]
    Deleted,
    #[serde(rename = "??")]
    Unknown,
    #[serde(rename = "bin")]
    Binary,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "add",
            Self::Modified => "mod",
            Self::Renamed => "mv",
            Self::Deleted => "rm",
            Self::Unknown => "??",
            Self::Binary => "bin",
            Self::NotApplicable => "n/a",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file touched by a changeset. Owned exclusively by its changeset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileChange {
    #[serde(default)]
    pub changeset_id: ChangesetId,
    #[serde(default)]
    pub revision: String,
    pub action: FileAction,
    pub path: String,
}

impl FileChange {
    pub fn new(revision: impl Into<String>, action: FileAction, path: impl Into<String>) -> Self {
        Self {
            changeset_id: 0,
            revision: revision.into(),
            action,
            path: path.into(),
        }
    }

    /// The file's logical current name.
    ///
    /// Renames store `old → new`; only the right-hand side is usable as a
    /// path elsewhere.
    pub fn current_path(&self) -> &str {
        if self.action == FileAction::Renamed {
            if let Some((_, new)) = self.path.split_once(RENAME_SEPARATOR) {
                return new;
            }
        }
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_path_splits_renames() {
        let file = FileChange::new("5", FileAction::Renamed, "src/old.rs → src/new.rs");
        assert_eq!(file.current_path(), "src/new.rs");
    }

    #[test]
    fn current_path_of_rename_without_separator() {
        let file = FileChange::new("5", FileAction::Renamed, "src/only.rs");
        assert_eq!(file.current_path(), "src/only.rs");
    }

    #[test]
    fn current_path_ignores_separator_for_other_actions() {
        let file = FileChange::new("5", FileAction::Modified, "a → b");
        assert_eq!(file.current_path(), "a → b");
    }

    #[test]
    fn action_serde_tags() {
        let json = serde_json::to_string(&FileAction::NotApplicable).unwrap();
        assert_eq!(json, "\"n/a\"");
        let action: FileAction = serde_json::from_str("\"mv\"").unwrap();
        assert_eq!(action, FileAction::Renamed);
    }
}
