use crate::error::StoreError;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sourcelink_core::error::CoreError;
use sourcelink_core::model::{
    BranchMapping, Changeset, ChangesetId, FileChange, IssueId, LinkDiff, RepoId, Repository,
    UserAssociation, UserId,
};
use sourcelink_core::tracker::Storage;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".sourcelink";

const REPOSITORIES: &str = "repositories.json";
const CHANGESETS: &str = "changesets.json";
const MAPPINGS: &str = "mappings.json";
const VCS_USERS: &str = "vcs_users.json";

/// File-backed persistence for repositories, changesets (with their owned
/// file entries and issue links), branch mappings, and VCS username
/// associations.
///
/// Each table is one JSON file under `.sourcelink/`, loaded whole at open
/// and rewritten atomically (temp file + rename) on mutation.
pub struct SourceStore {
    root: PathBuf,
    dir: PathBuf,
    repositories: Vec<Repository>,
    changesets: Vec<Changeset>,
    mappings: Vec<BranchMapping>,
    users: Vec<UserAssociation>,
}

impl SourceStore {
    /// Create a new data store at `path`.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        let dir = root.join(DATA_DIR);
        if dir.exists() {
            return Err(StoreError::DataDirExists(dir.display().to_string()));
        }
        fs::create_dir_all(&dir)?;

        let config = serde_json::json!({
            "version": 1,
            "created_at": Utc::now().to_rfc3339(),
        });
        fs::write(dir.join("config.json"), serde_json::to_string_pretty(&config)?)?;

        let store = Self {
            root,
            dir,
            repositories: Vec::new(),
            changesets: Vec::new(),
            mappings: Vec::new(),
            users: Vec::new(),
        };
        store.write_table(REPOSITORIES, &store.repositories)?;
        store.write_table(CHANGESETS, &store.changesets)?;
        store.write_table(MAPPINGS, &store.mappings)?;
        store.write_table(VCS_USERS, &store.users)?;
        Ok(store)
    }

    /// Open an existing data store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        let dir = root.join(DATA_DIR);
        if !dir.exists() {
            return Err(StoreError::DataDirNotFound(root.display().to_string()));
        }
        let mut changesets: Vec<Changeset> = read_table(&dir, CHANGESETS)?;
        // the persisted link set is by definition the prior set
        for cs in &mut changesets {
            cs.prior_issues = cs.issues.clone();
        }
        Ok(Self {
            repositories: read_table(&dir, REPOSITORIES)?,
            changesets,
            mappings: read_table(&dir, MAPPINGS)?,
            users: read_table(&dir, VCS_USERS)?,
            root,
            dir,
        })
    }

    /// Search upward from `start` for a `.sourcelink/` directory.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut current = start.as_ref().to_path_buf();
        loop {
            if current.join(DATA_DIR).exists() {
                return Self::open(&current);
            }
            if !current.pop() {
                return Err(StoreError::DataDirNotFound(
                    start.as_ref().display().to_string(),
                ));
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.sourcelink/` directory itself.
    pub fn data_dir(&self) -> &Path {
        &self.dir
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

    // --- repositories ---

    /// Create or update a repository. A blank type or name is fatal.
    /// Any cached mappings on the object are saved along with it.
    pub fn save_repository(&mut self, repo: &mut Repository) -> Result<(), StoreError> {
        if repo.vcs_type.trim().is_empty() {
            return Err(StoreError::EmptyField("type"));
        }
        if repo.name.trim().is_empty() {
            return Err(StoreError::EmptyField("name"));
        }
        if repo.id == 0 {
            repo.id = next_id(self.repositories.iter().map(|r| r.id));
            self.repositories.push(repo.clone());
        } else {
            match self.repositories.iter_mut().find(|r| r.id == repo.id) {
                Some(row) => *row = repo.clone(),
                None => self.repositories.push(repo.clone()),
            }
        }
        self.write_table(REPOSITORIES, &self.repositories)?;
        let mappings: Vec<BranchMapping> = repo.mappings.values().cloned().collect();
        for mapping in mappings {
            self.save_mapping(&mapping)?;
        }
        Ok(())
    }

    pub fn repository(&self, id: RepoId) -> Result<Repository, StoreError> {
        self.repositories
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::RepositoryNotFound(id.to_string()))
    }

    /// Look a repository up by exact name first, then by substring.
    pub fn repository_by_name(&self, name: &str) -> Result<Repository, StoreError> {
        let name = name.trim();
        self.repositories
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .or_else(|| self.repositories.iter().find(|r| r.name.contains(name)))
            .cloned()
            .ok_or_else(|| StoreError::RepositoryNotFound(name.to_string()))
    }

    /// All repositories, ordered by name.
    pub fn repositories(&self) -> Vec<Repository> {
        let mut repos = self.repositories.clone();
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        repos
    }

    pub fn repository_exists(&self, id: RepoId) -> bool {
        self.repositories.iter().any(|r| r.id == id)
    }

    /// Delete a repository and, with it, all of its changesets and their
    /// files and mappings.
    pub fn delete_repository(&mut self, id: RepoId) -> Result<(), StoreError> {
        self.repositories.retain(|r| r.id != id);
        self.changesets.retain(|c| c.repo_id != id);
        self.mappings.retain(|m| m.repo_id != id);
        self.write_table(REPOSITORIES, &self.repositories)?;
        self.write_table(CHANGESETS, &self.changesets)?;
        self.write_table(MAPPINGS, &self.mappings)
    }

    /// Fill the repository's cached branch list, when not already loaded.
    pub fn load_branches(&self, repo: &mut Repository) {
        if repo.branches.is_empty() {
            repo.branches = self.branches(repo.id);
        }
    }

    /// Fill the repository's cached mapping set, when not already loaded.
    pub fn load_mappings(&self, repo: &mut Repository) {
        if repo.mappings.is_empty() {
            repo.mappings = self.mappings_by_repo(repo.id);
        }
    }

    // --- changesets ---

    /// Create or update a changeset, its files, and its issue links.
    ///
    /// A zero repository reference is fatal. An unsaved changeset whose
    /// (repository, revision) pair already exists adopts the stored row, so
    /// re-ingesting a batch updates rather than duplicates. Returns the
    /// link diff against the previously-persisted set.
    pub fn save_changeset(&mut self, cs: &mut Changeset) -> Result<LinkDiff, StoreError> {
        if cs.repo_id == 0 {
            return Err(StoreError::MissingRepository(cs.id));
        }
        cs.normalize_links();

        let prior: Vec<IssueId> = if cs.id != 0 {
            self.changesets
                .iter()
                .find(|c| c.id == cs.id)
                .map(|c| c.issues.clone())
                .unwrap_or_default()
        } else if let Some(existing) = self
            .changesets
            .iter()
            .find(|c| c.repo_id == cs.repo_id && c.revision == cs.revision)
        {
            cs.id = existing.id;
            existing.issues.clone()
        } else {
            Vec::new()
        };
        let diff = LinkDiff::between(&prior, &cs.issues);

        if cs.id == 0 {
            cs.id = next_id(self.changesets.iter().map(|c| c.id));
        }
        for file in &mut cs.files {
            file.changeset_id = cs.id;
        }
        cs.prior_issues = cs.issues.clone();

        match self.changesets.iter_mut().find(|c| c.id == cs.id) {
            Some(row) => *row = cs.clone(),
            None => self.changesets.push(cs.clone()),
        }
        self.write_table(CHANGESETS, &self.changesets)?;
        Ok(diff)
    }

    pub fn changeset(&self, id: ChangesetId) -> Result<Changeset, StoreError> {
        self.changesets
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::ChangesetNotFound(id.to_string()))
    }

    pub fn changeset_by_revision(
        &self,
        repo_id: RepoId,
        revision: &str,
    ) -> Result<Changeset, StoreError> {
        self.changesets
            .iter()
            .find(|c| c.repo_id == repo_id && c.revision == revision)
            .cloned()
            .ok_or_else(|| StoreError::ChangesetNotFound(revision.to_string()))
    }

    pub fn changeset_exists(
        &self,
        repo_id: RepoId,
        revision: &str,
        branch: Option<&str>,
    ) -> bool {
        self.changesets.iter().any(|c| {
            c.repo_id == repo_id
                && c.revision == revision
                && branch.is_none_or(|b| c.branch == b)
        })
    }

    /// A repository's changesets, most recent first.
    pub fn changesets_by_repo(&self, repo_id: RepoId) -> Vec<Changeset> {
        let mut rows: Vec<Changeset> = self
            .changesets
            .iter()
            .filter(|c| c.repo_id == repo_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows
    }

    /// Changesets linked to an issue, most recent first.
    pub fn changesets_by_issue(&self, issue_id: IssueId) -> Vec<Changeset> {
        let mut rows: Vec<Changeset> = self
            .changesets
            .iter()
            .filter(|c| c.issues.contains(&issue_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows
    }

    /// Distinct branch names seen in a repository's changesets, sorted.
    pub fn branches(&self, repo_id: RepoId) -> Vec<String> {
        let mut branches: Vec<String> = self
            .changesets
            .iter()
            .filter(|c| c.repo_id == repo_id && !c.branch.is_empty())
            .map(|c| c.branch.clone())
            .collect();
        branches.sort();
        branches.dedup();
        branches
    }

    /// Append a file entry to an already-persisted changeset.
    pub fn add_file(
        &mut self,
        changeset_id: ChangesetId,
        mut file: FileChange,
    ) -> Result<(), StoreError> {
        if changeset_id == 0 {
            return Err(StoreError::MissingChangeset);
        }
        let cs = self
            .changesets
            .iter_mut()
            .find(|c| c.id == changeset_id)
            .ok_or_else(|| StoreError::ChangesetNotFound(changeset_id.to_string()))?;
        file.changeset_id = changeset_id;
        cs.files.push(file);
        self.write_table(CHANGESETS, &self.changesets)
    }

    // --- branch mappings ---

    /// Create or replace the mapping for (repository, branch) — at most one
    /// mapping exists per pair.
    pub fn save_mapping(&mut self, mapping: &BranchMapping) -> Result<(), StoreError> {
        if mapping.branch.trim().is_empty() {
            return Err(StoreError::EmptyField("branch"));
        }
        match self
            .mappings
            .iter_mut()
            .find(|m| m.repo_id == mapping.repo_id && m.branch == mapping.branch)
        {
            Some(row) => *row = mapping.clone(),
            None => self.mappings.push(mapping.clone()),
        }
        self.write_table(MAPPINGS, &self.mappings)
    }

    pub fn delete_mapping(&mut self, repo_id: RepoId, branch: &str) -> Result<(), StoreError> {
        let before = self.mappings.len();
        self.mappings
            .retain(|m| !(m.repo_id == repo_id && m.branch == branch));
        if self.mappings.len() == before {
            return Err(StoreError::MappingNotFound(branch.to_string()));
        }
        self.write_table(MAPPINGS, &self.mappings)
    }

    pub fn mappings_by_repo(&self, repo_id: RepoId) -> BTreeMap<String, BranchMapping> {
        self.mappings
            .iter()
            .filter(|m| m.repo_id == repo_id)
            .map(|m| (m.branch.clone(), m.clone()))
            .collect()
    }

    // --- VCS username associations ---

    /// Persist an association. A blank username deletes any stored entry
    /// instead of keeping an empty row.
    pub fn save_association(&mut self, assoc: &UserAssociation) -> Result<(), StoreError> {
        if assoc.username.trim().is_empty() {
            self.users.retain(|u| u.user_id != assoc.user_id);
        } else {
            match self.users.iter_mut().find(|u| u.user_id == assoc.user_id) {
                Some(row) => row.username = assoc.username.clone(),
                None => self.users.push(assoc.clone()),
            }
        }
        self.write_table(VCS_USERS, &self.users)
    }

    pub fn association(&self, user_id: UserId) -> Option<UserAssociation> {
        self.users.iter().find(|u| u.user_id == user_id).cloned()
    }

    pub fn associations(&self) -> Vec<UserAssociation> {
        let mut rows = self.users.clone();
        rows.sort_by_key(|u| u.user_id);
        rows
    }

    /// username → user id, as consumed by the identity resolver.
    pub fn user_map(&self) -> HashMap<String, UserId> {
        self.users
            .iter()
            .map(|u| (u.username.clone(), u.user_id))
            .collect()
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

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn into_core(err: StoreError) -> CoreError {
    CoreError::Storage(err.to_string())
}

impl Storage for SourceStore {
    fn repositories_for(
        &self,
        changesets: &[Changeset],
    ) -> Result<HashMap<RepoId, Repository>, CoreError> {
        let mut repos = HashMap::new();
        for cs in changesets {
            if !repos.contains_key(&cs.repo_id) {
                if let Ok(repo) = self.repository(cs.repo_id) {
                    repos.insert(repo.id, repo);
                }
            }
        }
        Ok(repos)
    }

    fn save_changeset(&mut self, changeset: &mut Changeset) -> Result<LinkDiff, CoreError> {
        SourceStore::save_changeset(self, changeset).map_err(into_core)
    }

    fn branch_mappings(
        &self,
        repo_id: RepoId,
    ) -> Result<BTreeMap<String, BranchMapping>, CoreError> {
        Ok(self.mappings_by_repo(repo_id))
    }

    fn vcs_user_map(&self) -> Result<HashMap<String, UserId>, CoreError> {
        Ok(self.user_map())
    }
}
