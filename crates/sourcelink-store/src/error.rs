use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data directory not found (searched upward from {0})")]
    DataDirNotFound(String),

    #[error("data directory already exists at {0}")]
    DataDirExists(String),

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("changeset not found: {0}")]
    ChangesetNotFound(String),

    #[error("changeset {0} has no repository reference")]
    MissingRepository(i64),

    #[error("file entry has no changeset reference")]
    MissingChangeset,

    #[error("branch mapping not found: {0}")]
    MappingNotFound(String),

    #[error("issue not found: {0}")]
    IssueNotFound(i64),
}
