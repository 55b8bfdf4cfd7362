use crate::error::FetchError;
use crate::events::{EventSink, PipelineEvent};
use crate::repo::{BRANCH_CANDIDATES, RepoRef};
use std::time::Duration;

pub const DEFAULT_GITHUB_URL: &str = "https://github.com";

const USER_AGENT: &str = concat!("gitdown/", env!("CARGO_PKG_VERSION"));

/// A branch that answered with a success status, together with the open
/// response so the archive can be streamed without a second request.
pub struct ResolvedBranch {
    pub branch: String,
    pub url: String,
    pub response: reqwest::Response,
}

/// Thin HTTP client for GitHub's branch archive endpoint.
pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GithubClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| FetchError::Transport {
            url: base_url.to_string(),
            source,
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Requests each branch candidate in order and returns the first that exists.
    ///
    /// A non-success status moves on to the next candidate. A transport failure
    /// (DNS, refused connection, timeout) is fatal and stops the probe at once.
    pub async fn resolve_branch(
        &self,
        repo: &RepoRef,
        sink: &dyn EventSink,
    ) -> Result<ResolvedBranch, FetchError> {
        let mut tried = Vec::new();

        for branch in BRANCH_CANDIDATES {
            let url = repo.archive_url(&self.base_url, branch);
            log::debug!("probing {}", url);
            tried.push(branch.to_string());

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            if status.is_success() {
                log::debug!("branch {} resolved with {}", branch, status);
                sink.emit(PipelineEvent::BranchResolved {
                    branch: branch.to_string(),
                    url: url.clone(),
                });
                return Ok(ResolvedBranch {
                    branch: branch.to_string(),
                    url,
                    response,
                });
            }

            log::debug!("branch {} not available: {}", branch, status);
            sink.emit(PipelineEvent::BranchMissing {
                branch: branch.to_string(),
                status: status.as_u16(),
            });
        }

        Err(FetchError::BranchNotFound {
            owner: repo.owner().to_string(),
            repo: repo.name().to_string(),
            tried,
        })
    }
}
