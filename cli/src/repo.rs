use crate::error::FetchError;
use std::fmt;

/// Branch names tried, in order, when resolving a repository's default branch.
pub const BRANCH_CANDIDATES: [&str; 2] = ["main", "master"];

/// A GitHub repository, identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    pub fn new(owner: &str, name: &str) -> Result<Self, FetchError> {
        let owner = owner.trim();
        let name = name.trim();

        if owner.is_empty() {
            return Err(FetchError::InvalidRepoRef("owner must not be empty".into()));
        }
        if name.is_empty() {
            return Err(FetchError::InvalidRepoRef(
                "repository name must not be empty".into(),
            ));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory name used under the application folder, e.g. `acme--widget`.
    pub fn slug(&self) -> String {
        format!("{}--{}", self.owner, self.name)
    }

    /// Zip archive URL for a branch, relative to a GitHub-compatible base URL.
    pub fn archive_url(&self, base_url: &str, branch: &str) -> String {
        format!(
            "{}/{}/{}/archive/refs/heads/{}.zip",
            base_url.trim_end_matches('/'),
            self.owner,
            self.name,
            branch
        )
    }

    /// File name the downloaded archive is saved under before extraction.
    pub fn archive_file_name(&self, branch: &str) -> String {
        format!("{}_{}.zip", self.name, branch)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
