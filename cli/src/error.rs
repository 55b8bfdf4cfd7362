use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors from the fetch pipeline. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid repository reference: {0}")]
    InvalidRepoRef(String),

    #[error("no valid branch found for {owner}/{repo} (tried {})", tried.join(", "))]
    BranchNotFound {
        owner: String,
        repo: String,
        tried: Vec<String>,
    },

    #[error("network error while requesting {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

/// Errors while unpacking an archive into its destination.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry `{0}` would be written outside the destination")]
    UnsafeEntry(String),

    #[error("extraction failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction worker stopped unexpectedly: {0}")]
    Worker(String),
}

/// Non-fatal: a dependency installer could not finish its job.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("`{0}` was not found on PATH")]
    ToolMissing(String),

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Short machine-friendly label, used by the JSON event sink.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRepoRef(_) => "invalid_repo_ref",
            Self::BranchNotFound { .. } => "branch_not_found",
            Self::Transport { .. } => "transport",
            Self::Io { .. } => "io",
            Self::Extraction(_) => "extraction",
        }
    }
}
