//! Data models of GitHub Actions workflows.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::Deserialize;

pub mod artifact;
pub mod client;
pub mod filter;

/// Represents a GitHub Actions workflow run from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowRun {
    /// The run ID. Newer runs have greater IDs.
    pub id: u64,
    /// The branch the run was triggered on.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// The event that triggered the run, e.g. `push`.
    pub event: String,
    /// The URL listing the artifacts of this run.
    pub artifacts_url: String,
    /// The commit the run was triggered for.
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
    /// When the run was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Display for WorkflowRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.head_branch {
            Some(branch) => write!(f, "{} ({} on {branch})", self.id, self.event),
            None => write!(f, "{} ({})", self.id, self.event),
        }
    }
}

/// The head commit of a [`WorkflowRun`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HeadCommit {
    /// The commit SHA.
    pub id: String,
    /// The commit message.
    pub message: String,
}

/// One page of workflow runs.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowRuns {
    /// The number of runs matching the query across all pages.
    pub total_count: u64,
    /// The runs on this page, newest first.
    pub workflow_runs: Vec<WorkflowRun>,
}
