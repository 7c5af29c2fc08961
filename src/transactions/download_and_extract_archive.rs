use std::{
    io::{self, Seek as _},
    path::{Path, PathBuf},
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    fs::{create_private_dir, create_private_file, remove_file_if_exists},
    transactions::{Section, download_artifact, extract_archive, resolve_download_url},
    workflow::{artifact::Artifact, client::GitHubClient},
};

/// Where a downloaded artifact ended up.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The archive was kept as is.
    Archive(PathBuf),
    /// The archive was extracted into a directory and removed.
    Extracted {
        /// The directory holding the extracted entries.
        path: PathBuf,
        /// The number of entries extracted.
        entries: usize,
    },
}

/// Turns an artifact name into a single safe path component.
pub fn artifact_file_name(name: &str) -> String {
    let sanitized = sanitize_filename::sanitize(name);
    if sanitized.is_empty() {
        String::from("artifact")
    } else {
        sanitized
    }
}

/// Downloads an [`Artifact`] into `dest`, extracting it when `unpack` is set.
///
/// The archive is written to `<dest>/<name>.zip`. When unpacking, its entries are extracted under `<dest>/<name>/`
/// and the archive is removed afterwards. The archive length is taken from the written file, never from the size the
/// manifest reports.
///
/// See: [`resolve_download_url`], [`download_artifact`], [`extract_archive`]
///
/// # Errors
///
/// Returns an error if any step fails. Files written before the failure are left in place.
pub async fn download_and_extract_archive(
    client: &GitHubClient,
    artifact: &Artifact,
    dest: &Path,
    unpack: bool,
    cancel: &CancellationToken,
) -> Result<Delivery> {
    let url = resolve_download_url(client, artifact, cancel).await?;

    create_private_dir(dest).await?;
    let name = artifact_file_name(&artifact.name);
    let zip_path = dest.join(format!("{name}.zip"));
    let mut file = create_private_file(&zip_path).await?;

    info!("downloading artifact {artifact}…");
    let downloaded = download_artifact(client, &url, &mut file, &zip_path, cancel).await?;
    verify_digest(artifact, &downloaded.sha256)?;
    info!(
        "downloaded artifact {} to {} ({} bytes)",
        artifact.name,
        zip_path.display(),
        downloaded.bytes
    );

    if !unpack {
        return Ok(Delivery::Archive(zip_path));
    }

    let file = file.into_std().await;
    let target = dest.join(&name);
    let entries = tokio::task::spawn_blocking({
        let target = target.clone();
        move || unpack_archive(file, &zip_path, &target)
    })
    .await
    .map_err(|err| Error::filesystem("extract", &target, io::Error::other(err)))??;

    info!(
        "successfully extracted {} entries of {} to {}",
        entries,
        artifact.name,
        target.display()
    );
    Ok(Delivery::Extracted {
        path: target,
        entries,
    })
}

fn unpack_archive(mut file: std::fs::File, zip_path: &Path, target: &Path) -> Result<usize> {
    let len = file
        .stream_position()
        .map_err(|err| Error::filesystem("measure", zip_path, err))?;
    debug!("extracting {len} bytes of {}…", zip_path.display());

    let section =
        Section::new(&file, len).map_err(|err| Error::filesystem("rewind", zip_path, err))?;
    let entries = extract_archive(section, zip_path, target)?;

    drop(file);
    remove_file_if_exists(zip_path)?;

    Ok(entries)
}

fn verify_digest(artifact: &Artifact, actual: &str) -> Result<()> {
    let Some(digest) = &artifact.digest else {
        debug!("digest not provided for artifact {}", artifact.name);
        return Ok(());
    };
    let Some(expected) = digest.strip_prefix("sha256:") else {
        warn!(
            "unsupported digest {digest} for artifact {}, skipping verification",
            artifact.name
        );
        return Ok(());
    };

    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(Error::DigestMismatch {
            name: artifact.name.clone(),
            expected: expected.to_owned(),
            actual: actual.to_owned(),
        })
    }
}
