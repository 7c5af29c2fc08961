use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    workflow::{
        WorkflowRun,
        artifact::{Artifact, Artifacts},
        client::{GitHubClient, fetch_json},
    },
};

/// Fetches the artifact manifest of a workflow run, in listing order.
///
/// # Errors
///
/// Returns [`Error::Remote`](crate::Error::Remote) on an error status, [`Error::Transport`](crate::Error::Transport)
/// if the request fails, or [`Error::Decode`](crate::Error::Decode) on a malformed manifest.
pub async fn fetch_artifacts(
    client: &GitHubClient,
    run: &WorkflowRun,
    cancel: &CancellationToken,
) -> Result<Vec<Artifact>> {
    let url = &run.artifacts_url;
    debug!("fetching artifacts from {url}…");

    let manifest: Artifacts = fetch_json(client.request(url), url, cancel).await?;

    match manifest.artifacts.len() {
        1 => info!("fetched 1 artifact from {url}"),
        count => info!("fetched {count} artifacts from {url}"),
    }
    if let Some(total_count) = manifest.total_count {
        let listed = manifest.artifacts.len() as u64;
        if total_count > listed {
            warn!("run {} lists {listed} of {total_count} artifacts", run.id);
        }
    }

    Ok(manifest.artifacts)
}
