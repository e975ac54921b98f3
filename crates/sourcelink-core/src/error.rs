use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid {name} pattern: {source}")]
    InvalidPattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("repository not found: {0}")]
    RepositoryNotFound(i64),

    #[error("changeset {0} has no repository reference")]
    MissingRepository(i64),

    #[error("issue not found: {0}")]
    IssueNotFound(i64),

    #[error("product matrix integration is enabled but no matrix is available")]
    MatrixUnavailable,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("tracker error: {0}")]
    Tracker(String),
}
