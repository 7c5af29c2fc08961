//! Artifacts from GitHub REST API.

use std::fmt::{self, Display};

use serde::Deserialize;

/// Represents the artifact manifest of a workflow run.
#[derive(Debug, Deserialize, Clone)]
pub struct Artifacts {
    /// The number of artifacts, when reported.
    #[serde(default)]
    pub total_count: Option<u64>,
    /// The artifacts in listing order.
    pub artifacts: Vec<Artifact>,
}

/// Represents an artifact from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct Artifact {
    /// The artifact ID.
    pub id: u64,
    /// The artifact name.
    pub name: String,
    /// The size reported by GitHub. Unreliable, and never used to read the downloaded archive.
    #[serde(default)]
    pub size_in_bytes: u64,
    /// The API URL redirecting to the archive.
    pub archive_download_url: String,
    /// Whether the artifact is past its retention period.
    #[serde(default)]
    pub expired: bool,
    /// The digest of the archive, such as `sha256:<hex>`.
    #[serde(default)]
    pub digest: Option<String>,
}

impl Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} at {})",
            self.name, self.id, self.archive_download_url
        )
    }
}
