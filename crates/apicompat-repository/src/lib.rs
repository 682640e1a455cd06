//! Artifact repository access for apicompat.
//!
//! This crate answers the two questions the compatibility check asks of an
//! artifact repository:
//!
//! - which released version is the highest one inside a version range, and
//! - where on the local disk the file for a given coordinate lives.
//!
//! [`ArtifactRepository`] is the seam the check engine depends on.
//! [`MavenRepository`] implements it against a local Maven-layout repository
//! backed by any number of remote HTTP repositories.
//!
//! # Example
//!
//! ```ignore
//! use apicompat_repository::{ArtifactCoordinate, ArtifactRepository, MavenRepository, VersionRange};
//!
//! let repo = MavenRepository::new(local_repo, vec![apicompat_repository::MAVEN_CENTRAL.to_string()])?;
//! let range = VersionRange::for_major(2);
//! if let Some(version) = repo.resolve_highest_version("org.example", "demo", &range)? {
//!     let coordinate = ArtifactCoordinate::new("org.example", "demo", version)?;
//!     let jar = repo.resolve_artifact_file(&coordinate)?;
//! }
//! ```

use std::path::PathBuf;

mod coordinate;
mod maven;
mod version;

pub use coordinate::{ArtifactCoordinate, CoordinateError};
pub use maven::{MAVEN_CENTRAL, MavenRepository};
pub use version::{MavenVersion, RangeParseError, VersionRange};

/// The artifact repository service consumed by the compatibility check.
pub trait ArtifactRepository {
    /// Highest available version of `group_id:artifact_id` inside `range`.
    ///
    /// `Ok(None)` means the repository answered but nothing matched.
    fn resolve_highest_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        range: &VersionRange,
    ) -> Result<Option<String>, RepositoryError>;

    /// Local file holding the artifact, fetching it first if necessary.
    fn resolve_artifact_file(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<PathBuf, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("artifact not found in any repository: {0}")]
    NotFound(String),

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid repository metadata at {location}: {message}")]
    Metadata { location: String, message: String },

    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
