//! Drives the retrieval of artifacts across workflow runs.
//!
//! Runs are visited one at a time in listing order, and the artifacts of a run one at a time in manifest order. The
//! checkpoint moves to a run before its artifacts are processed. Any error stops the whole traversal; the checkpoint
//! reached so far stays with the caller.

use std::{io::Write, path::Path};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    checkpoint::Checkpoint,
    config::{Config, Mode},
    error::{Error, Result},
    fs::{create_private_dir, write_private_file},
    transactions::{RunEnumerator, download_and_extract_archive, fetch_artifacts, fetch_run},
    workflow::{WorkflowRun, client::GitHubClient},
};

/// Retrieves the artifacts of every run `config` selects, advancing `checkpoint` as runs are visited.
///
/// Without an output directory, the download URL of each selected artifact is written to `out` instead.
///
/// # Errors
///
/// Returns the first error met. Runs visited before it are reflected in `checkpoint`.
pub async fn run<W>(
    client: &GitHubClient,
    config: &Config,
    checkpoint: &mut Checkpoint,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()>
where
    W: Write + Send,
{
    match config.mode {
        Mode::Single(run_id) => {
            let run = fetch_run(client, run_id, cancel).await?;
            checkpoint.advance(run.id);
            process_run(client, config, &run, cancel, out).await
        }
        Mode::Since(lower_bound) => {
            info!(
                "retrieving artifacts of {}/{} newer than run {lower_bound}…",
                client.owner(),
                client.repo()
            );
            let query = config.query();
            let mut runs = RunEnumerator::new(client, &query);

            while let Some(run) = runs.next_run(cancel).await? {
                if checkpoint.advance(run.id) {
                    debug!("checkpoint moved to {checkpoint}");
                }
                process_run(client, config, &run, cancel, out).await?;
            }

            info!("visited every run newer than {lower_bound}");
            Ok(())
        }
    }
}

async fn process_run<W>(
    client: &GitHubClient,
    config: &Config,
    run: &WorkflowRun,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()>
where
    W: Write + Send,
{
    match run.created_at {
        Some(created_at) => info!("processing run {run} created at {created_at}…"),
        None => info!("processing run {run}…"),
    }

    let artifacts = fetch_artifacts(client, run, cancel).await?;
    let run_dir = config
        .output
        .as_ref()
        .map(|output| output.join(run.id.to_string()));
    let mut described = false;

    for artifact in artifacts
        .iter()
        .filter(|artifact| config.filter.select(artifact).is_selected())
    {
        let Some(run_dir) = &run_dir else {
            writeln!(out, "{}", artifact.archive_download_url)
                .map_err(|err| Error::filesystem("write", "standard output", err))?;
            continue;
        };

        if !described {
            describe_run(run, run_dir).await?;
            described = true;
        }
        download_and_extract_archive(client, artifact, run_dir, config.filter.unpack, cancel)
            .await?;
    }

    Ok(())
}

/// Writes the `commit`, `event` and `message` side-car files of a run.
async fn describe_run(run: &WorkflowRun, run_dir: &Path) -> Result<()> {
    create_private_dir(run_dir).await?;

    let commit = run.head_commit.clone().unwrap_or_default();
    write_private_file(&run_dir.join("commit"), commit.id.as_bytes()).await?;
    write_private_file(&run_dir.join("event"), run.event.as_bytes()).await?;
    write_private_file(&run_dir.join("message"), commit.message.as_bytes()).await
}
