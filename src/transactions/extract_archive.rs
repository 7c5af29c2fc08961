use std::{
    fs,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};

/// A reader over the first `len` bytes of a seekable reader.
///
/// Lets an archive be parsed from exactly the bytes that were written, whatever else the underlying handle holds.
#[derive(Debug)]
pub struct Section<R> {
    inner: R,
    len: u64,
    pos: u64,
}

impl<R> Section<R>
where
    R: Read + Seek,
{
    /// Creates a [`Section`] over bytes `0..len` of `inner`.
    ///
    /// # Errors
    ///
    /// Returns an error if `inner` cannot be rewound.
    pub fn new(mut inner: R, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, len, pos: 0 })
    }

    /// The length of the section.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the section is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R> Read for Section<R>
where
    R: Read + Seek,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = usize::try_from(remaining).map_or(buf.len(), |remaining| remaining.min(buf.len()));
        let read = self.inner.read(&mut buf[..max])?;
        self.pos += read as u64;
        Ok(read)
    }
}

impl<R> Seek for Section<R>
where
    R: Read + Seek,
{
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(offset) => i128::from(self.len) + i128::from(offset),
            SeekFrom::Current(offset) => i128::from(self.pos) + i128::from(offset),
        };
        let target = u64::try_from(target).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the section",
            )
        })?;

        self.inner.seek(SeekFrom::Start(target))?;
        self.pos = target;
        Ok(target)
    }
}

/// Extracts every entry of a zip archive under `dest`, in stored order, returning the number of entries written.
///
/// Directory entries become empty directories. File entries get their parent directories created, and keep their
/// stored unix permission bits. Entries whose path would escape `dest` are skipped. Nothing is rolled back on
/// failure; whatever was extracted so far stays on disk.
///
/// `archive_path` only names the archive in errors.
///
/// # Errors
///
/// Returns [`Error::Archive`] if the archive cannot be parsed, or [`Error::Filesystem`] if writing an entry fails.
pub fn extract_archive<R>(reader: R, archive_path: &Path, dest: &Path) -> Result<usize>
where
    R: Read + Seek,
{
    let archive_error = |source| Error::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut archive = ZipArchive::new(reader).map_err(archive_error)?;
    fs::create_dir_all(dest).map_err(|err| Error::filesystem("create directory", dest, err))?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_error)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(
                "skipping entry {} escaping {}",
                entry.name(),
                dest.display()
            );
            continue;
        };
        let path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&path)
                .map_err(|err| Error::filesystem("create directory", &path, err))?;
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| Error::filesystem("create directory", parent, err))?;
            }

            let mut file =
                fs::File::create(&path).map_err(|err| Error::filesystem("create file", &path, err))?;
            io::copy(&mut entry, &mut file)
                .map_err(|err| Error::filesystem("extract", &path, err))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt as _;

                fs::set_permissions(&path, fs::Permissions::from_mode(mode & 0o777))
                    .map_err(|err| Error::filesystem("set permissions of", &path, err))?;
            }
        }

        debug!("extracted {}", path.display());
        extracted += 1;
    }

    Ok(extracted)
}
