//! Filesystem helpers for the output tree.

use std::{io, path::Path};

use tokio::{fs::OpenOptions, io::AsyncWriteExt as _};

use crate::error::{Error, Result};

/// Creates `path` and its parents as owner-only directories. Succeeds if it already exists.
pub(crate) async fn create_private_dir(path: &Path) -> Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);

    builder
        .create(path)
        .await
        .map_err(|err| Error::filesystem("create directory", path, err))
}

/// Opens `path` for reading and writing as an owner-only file, truncating it if it exists.
pub(crate) async fn create_private_file(path: &Path) -> Result<tokio::fs::File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    options
        .open(path)
        .await
        .map_err(|err| Error::filesystem("create file", path, err))
}

/// Writes `contents` to `path` as an owner-only file.
pub(crate) async fn write_private_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = create_private_file(path).await?;
    file.write_all(contents)
        .await
        .map_err(|err| Error::filesystem("write", path, err))?;
    file.flush()
        .await
        .map_err(|err| Error::filesystem("write", path, err))
}

/// Removes the file at `path`. A missing file is not an error.
pub(crate) fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::filesystem("remove", path, err)),
    }
}
