//! The immutable configuration of one invocation.

use std::{path::PathBuf, time::Duration};

use crate::{
    checkpoint::Checkpoint,
    error::{Error, Result},
    transactions::RunQuery,
    workflow::{
        client::{Credentials, DEFAULT_API_URL, DEFAULT_TIMEOUT, GitHubClient},
        filter::Filter,
    },
};

/// Which runs an invocation visits.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every run newer than the given run ID.
    Since(u64),
    /// Only the given run.
    Single(u64),
}

/// Everything an invocation needs, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// The repository owner.
    pub owner: String,
    /// The repository name.
    pub repo: String,
    /// The base URL of GitHub REST API.
    pub api_url: String,
    /// The API credentials.
    pub credentials: Credentials,
    /// Which runs to visit.
    pub mode: Mode,
    /// Only runs triggered on this branch.
    pub branch: Option<String>,
    /// Only runs triggered by this event.
    pub event: Option<String>,
    /// Which artifacts to download, and whether to unpack them.
    pub filter: Filter,
    /// Where artifacts are written. Without one, download URLs are printed instead.
    pub output: Option<PathBuf>,
    /// The bound of each API request.
    pub timeout: Duration,
}

impl Config {
    /// Creates a [`Config`] for `repository` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `repository` is not of the form `<owner>/<repo>`.
    pub fn new(repository: &str, credentials: Credentials) -> Result<Self> {
        let (owner, repo) = parse_repository(repository)?;
        Ok(Self {
            owner,
            repo,
            api_url: DEFAULT_API_URL.to_owned(),
            credentials,
            mode: Mode::Since(0),
            branch: None,
            event: None,
            filter: Filter::default(),
            output: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// The run query of [`Mode::Since`]. In [`Mode::Single`], the lower bound is zero.
    pub fn query(&self) -> RunQuery {
        RunQuery {
            lower_bound: match self.mode {
                Mode::Since(run_id) => run_id,
                Mode::Single(_) => 0,
            },
            branch: self.branch.clone(),
            event: self.event.clone(),
        }
    }

    /// The checkpoint before any run is visited.
    pub fn starting_checkpoint(&self) -> Checkpoint {
        match self.mode {
            Mode::Since(run_id) => Checkpoint::new(run_id),
            Mode::Single(_) => Checkpoint::default(),
        }
    }

    /// Builds the client the configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn client(&self) -> Result<GitHubClient> {
        GitHubClient::new(
            &self.api_url,
            &self.owner,
            &self.repo,
            self.credentials.clone(),
            self.timeout,
        )
    }
}

/// Splits `<owner>/<repo>`.
///
/// # Errors
///
/// Returns [`Error::Config`] unless `repository` is exactly two non-empty segments.
pub fn parse_repository(repository: &str) -> Result<(String, String)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_owned(), repo.to_owned()))
        }
        _ => Err(Error::Config(format!(
            "repository must be of the form <owner>/<repo>, got {repository:?}"
        ))),
    }
}
