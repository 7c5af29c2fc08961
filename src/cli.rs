//! Command-line flags and their environment fallbacks.

use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser};
use tracing::Level;

use crate::{
    config::{Config, Mode},
    error::{Error, Result},
    workflow::{
        client::{Credentials, DEFAULT_API_URL},
        filter::{Filter, MATCH_ALL},
    },
};

/// Downloads GitHub Actions artifacts of every run newer than a given run ID.
///
/// Prints the highest run ID visited on exit; pass it back as `--id` to resume.
#[derive(Debug, Parser)]
#[command(name = "artifact-fetch", version, about, long_about = None)]
pub struct Cli {
    /// The repository holding the artifacts, as <owner>/<repo>.
    #[arg(long, env = "GITHUB_REPO")]
    pub repo: Option<String>,

    /// The API token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// A user name to authenticate with basic auth instead of a bearer token.
    #[arg(long, env = "GITHUB_USER")]
    pub user: Option<String>,

    /// Only runs newer than this run ID are visited. With --single, the only run visited.
    #[arg(long, env = "GITHUB_WORKFLOW_ID", default_value_t = 0)]
    pub id: u64,

    /// Visit only the run given by --id.
    #[arg(long)]
    pub single: bool,

    /// Only runs triggered on this branch.
    #[arg(long)]
    pub branch: Option<String>,

    /// Only runs triggered by this event.
    #[arg(long)]
    pub event: Option<String>,

    /// Only artifacts whose name matches this regular expression.
    #[arg(long, env = "ARTIFACT_PATTERN", default_value = MATCH_ALL)]
    pub pattern: String,

    /// Extract downloaded archives.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub unpack: bool,

    /// The directory artifacts are written to. Without one, download URLs are printed instead.
    #[arg(long, env = "ARTIFACT_OUTPUT")]
    pub output: Option<PathBuf>,

    /// The base URL of GitHub REST API.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// The bound of each API request, in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// The log level.
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl Cli {
    /// Validates the flags into a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required flag is missing or a value is invalid.
    pub fn into_config(self) -> Result<Config> {
        let repository = non_empty(self.repo)
            .ok_or_else(|| Error::Config(String::from("must set --repo or GITHUB_REPO")))?;
        let token = non_empty(self.token)
            .ok_or_else(|| Error::Config(String::from("must set --token or GITHUB_TOKEN")))?;
        let credentials = match non_empty(self.user) {
            Some(user) => Credentials::Basic { user, token },
            None => Credentials::Token(token),
        };

        let mode = if self.single {
            if self.id == 0 {
                return Err(Error::Config(String::from("--single requires a run --id")));
            }
            Mode::Single(self.id)
        } else {
            Mode::Since(self.id)
        };
        if self.timeout == 0 {
            return Err(Error::Config(String::from("--timeout must be positive")));
        }

        let mut config = Config::new(&repository, credentials)?;
        config.api_url = self.api_url;
        config.mode = mode;
        config.branch = non_empty(self.branch);
        config.event = non_empty(self.event);
        config.filter = Filter::new(&self.pattern, self.unpack)?;
        config.output = self.output.filter(|output| !output.as_os_str().is_empty());
        config.timeout = Duration::from_secs(self.timeout);

        Ok(config)
    }

    /// Whether errors should be reported with their full causal chain.
    pub fn verbose(&self) -> bool {
        self.log_level >= Level::DEBUG
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
