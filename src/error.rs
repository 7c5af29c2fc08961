//! Errors raised while retrieving artifacts.

use std::{io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

/// An error raised while retrieving artifacts.
///
/// Every variant except [`Error::Config`] aborts the enumeration that raised it. Reaching the lower bound or running out
/// of pages is not an error.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// A required setting is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The request never produced a response.
    #[error("failed to reach {url}")]
    Transport {
        /// The requested URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A shutdown signal cancelled the operation at a network boundary.
    #[error("cancelled by shutdown signal")]
    Cancelled,

    /// The remote API answered with an error status.
    #[error("{url} returned {status}: {message}")]
    Remote {
        /// The requested URL.
        url: String,
        /// The status code of the response.
        status: StatusCode,
        /// The message supplied by the server, empty if there was none.
        message: String,
    },

    /// The response body was not the expected JSON document.
    #[error("failed to decode response from {url}")]
    Decode {
        /// The requested URL.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The downloaded archive could not be read.
    #[error("failed to read archive {}", .path.display())]
    Archive {
        /// The path of the archive on disk.
        path: PathBuf,
        /// The underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A filesystem operation failed.
    #[error("failed to {action} {}", .path.display())]
    Filesystem {
        /// What was being done, e.g. `create directory`.
        action: &'static str,
        /// The path the operation was performed on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The downloaded bytes disagree with the digest advertised by the manifest.
    #[error("digest mismatch for artifact {name}: expected {expected}, got {actual}")]
    DigestMismatch {
        /// The artifact name.
        name: String,
        /// The advertised SHA-256, hex encoded.
        expected: String,
        /// The SHA-256 of the downloaded bytes, hex encoded.
        actual: String,
    },
}

impl Error {
    /// Whether this error was caused by a shutdown signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_owned(),
            source,
        }
    }

    pub(crate) fn filesystem<P>(action: &'static str, path: P, source: io::Error) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

/// A [`Result`](std::result::Result) defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
