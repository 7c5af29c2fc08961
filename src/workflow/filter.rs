//! Selects which artifacts get downloaded.

use regex::Regex;
use tracing::debug;

use crate::{
    error::{Error, Result},
    workflow::artifact::Artifact,
};

/// The pattern used when none is configured. Matches every name.
pub const MATCH_ALL: &str = ".*";

/// Why an artifact was or was not selected.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The artifact should be downloaded.
    Selected,
    /// The artifact is past its retention period.
    Expired,
    /// The artifact name does not match the pattern.
    NotMatching,
}

impl Selection {
    /// Whether the artifact should be downloaded.
    pub fn is_selected(self) -> bool {
        self == Self::Selected
    }
}

/// A name pattern and whether to unpack what it selects.
#[derive(Debug, Clone)]
pub struct Filter {
    pattern: Regex,
    /// Whether selected archives are extracted after downloading.
    pub unpack: bool,
}

impl Filter {
    /// Compiles a [`Filter`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `pattern` is not a valid regular expression.
    pub fn new(pattern: &str, unpack: bool) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|err| Error::Config(format!("invalid artifact pattern {pattern:?}: {err}")))?;
        Ok(Self { pattern, unpack })
    }

    /// The source of the compiled pattern.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Decides whether `artifact` is downloaded. Expiry is checked before the name.
    pub fn select(&self, artifact: &Artifact) -> Selection {
        if artifact.expired {
            debug!("skipping expired artifact {}", artifact.name);
            Selection::Expired
        } else if self.pattern.is_match(&artifact.name) {
            Selection::Selected
        } else {
            debug!(
                "skipping non-matching artifact {}, pattern {}",
                artifact.name,
                self.pattern()
            );
            Selection::NotMatching
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            pattern: Regex::new(MATCH_ALL).expect("pattern is valid"),
            unpack: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Filter, Selection};
    use crate::workflow::artifact::Artifact;

    fn artifact(id: u64, name: &str, expired: bool) -> Artifact {
        Artifact {
            id,
            name: name.to_owned(),
            size_in_bytes: 100,
            archive_download_url: format!("https://example.com/{id}"),
            expired,
            digest: None,
        }
    }

    #[test]
    fn expired_wins_over_a_non_matching_name() {
        let filter = Filter::new("build.*", true).unwrap();

        assert_eq!(
            filter.select(&artifact(1, "build-logs", false)),
            Selection::Selected
        );
        assert_eq!(
            filter.select(&artifact(2, "coverage", true)),
            Selection::Expired
        );
        assert_eq!(
            filter.select(&artifact(3, "coverage", false)),
            Selection::NotMatching
        );
    }

    #[test]
    fn expired_artifacts_are_never_selected() {
        let filter = Filter::default();

        for name in ["build-logs", "coverage", ""] {
            assert!(!filter.select(&artifact(1, name, true)).is_selected());
            assert!(filter.select(&artifact(1, name, false)).is_selected());
        }
    }

    #[test]
    fn pattern_matches_anywhere_in_the_name() {
        let filter = Filter::new("logs", false).unwrap();

        assert!(filter.select(&artifact(1, "build-logs-linux", false)).is_selected());
        assert!(!filter.unpack);
        assert_eq!(filter.pattern(), "logs");
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = Filter::new("build(", true).unwrap_err();

        assert!(matches!(err, crate::Error::Config(_)));
    }
}
