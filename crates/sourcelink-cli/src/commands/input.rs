use anyhow::{Context, Result};
use serde::Deserialize;
use sourcelink_core::model::{
    parse_commit_timestamp, Changeset, FileAction, FileChange, RepoId, Signature,
};
use std::fs;
use std::path::Path;

/// One changeset as it appears in an ingestion batch file. Timestamps are
/// raw strings; malformed ones are recovered with a warning.
#[derive(Debug, Deserialize)]
pub struct ChangesetInput {
    pub revision: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub committer: String,
    #[serde(default)]
    pub committer_email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<FileInput>,
}

#[derive(Debug, Deserialize)]
pub struct FileInput {
    #[serde(default)]
    pub revision: String,
    pub action: FileAction,
    pub path: String,
}

/// Read a JSON batch file and convert it into changesets of `repo_id`.
pub fn load_batch(path: &Path, repo_id: RepoId) -> Result<Vec<Changeset>> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let inputs: Vec<ChangesetInput> =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(inputs
        .into_iter()
        .map(|input| to_changeset(input, repo_id))
        .collect())
}

fn to_changeset(input: ChangesetInput, repo_id: RepoId) -> Changeset {
    let mut cs = Changeset::new(repo_id, input.revision);
    cs.parent = input.parent;
    cs.branch = input.branch;
    cs.timestamp = parse_commit_timestamp(&input.timestamp);
    cs.author = Signature::new(input.author, input.author_email);
    cs.committer = Signature::new(input.committer, input.committer_email);
    cs.message = input.message;
    cs.files = input
        .files
        .into_iter()
        .map(|file| FileChange::new(file.revision, file.action, file.path))
        .collect();
    cs
}
