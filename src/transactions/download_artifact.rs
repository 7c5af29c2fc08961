use std::{path::Path, pin::pin};

use futures::StreamExt as _;
use reqwest::{StatusCode, header};
use sha2::{Digest as _, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    workflow::{
        artifact::Artifact,
        client::{GitHubClient, check_response, read_error_message, send},
    },
};

/// What was written by [`download_artifact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// The number of bytes written.
    pub bytes: u64,
    /// The SHA-256 of the written bytes, hex encoded.
    pub sha256: String,
}

/// Resolves the short-lived URL an artifact archive can be downloaded from.
///
/// # Errors
///
/// Returns [`Error::Remote`] carrying the server's message if GitHub does not redirect to the archive, or
/// [`Error::Transport`] if the request fails.
pub async fn resolve_download_url(
    client: &GitHubClient,
    artifact: &Artifact,
    cancel: &CancellationToken,
) -> Result<String> {
    let url = client.endpoint(&format!("actions/artifacts/{}/zip", artifact.id));
    debug!("requesting download from {url}…");

    let response = send(client.resolve_request(&url), &url, cancel).await?;
    let status = response.status();

    if status.is_redirection() {
        if let Some(location) = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
        {
            info!("requested download of artifact {}", artifact.name);
            return Ok(location.to_owned());
        }
    }

    debug!(
        "owner: {}, repo: {}, id: {}",
        client.owner(),
        client.repo(),
        artifact.id
    );
    let mut message = read_error_message(response).await;
    match status {
        StatusCode::GONE => debug!("failed to request download: artifact expired or removed"),
        _ if status.is_redirection() => message = "redirect without a location".to_owned(),
        _ => debug!("failed to request download from {url}: {status}"),
    }

    Err(Error::Remote {
        url,
        status,
        message,
    })
}

/// Streams the archive at `url` into `writer`, hashing it on the way.
///
/// `path` only names the destination in errors. Cancellation is observed between chunks.
///
/// # Errors
///
/// Returns an error if the request fails, the server answers with an error status, or writing fails.
pub async fn download_artifact<W>(
    client: &GitHubClient,
    url: &str,
    writer: &mut W,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<Downloaded>
where
    W: AsyncWrite + Unpin + Send,
{
    let response = check_response(send(client.download_request(url), url, cancel).await?, url).await?;
    let mut stream = pin!(response.bytes_stream());
    let mut hasher = Sha256::new();
    let mut bytes = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        let chunk = chunk.map_err(|err| Error::transport(url, err))?;

        hasher.update(&chunk);
        writer
            .write_all(&chunk)
            .await
            .map_err(|err| Error::filesystem("write", path, err))?;
        bytes += chunk.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|err| Error::filesystem("write", path, err))?;

    Ok(Downloaded {
        bytes,
        sha256: hex::encode(hasher.finalize()),
    })
}
