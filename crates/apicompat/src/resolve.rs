//! Picks the previous release to compare against.

use std::path::PathBuf;

use apicompat_repository::{ArtifactCoordinate, ArtifactRepository, VersionRange};

use crate::error::CheckError;
use crate::types::non_blank;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Version(String),
    /// Nothing to compare against and `skip_first_in_series` is set.
    FirstInSeries,
}

/// The range searched for the previous release of major series `major`:
/// `[major.0.0, (major+1).0.0)`.
pub fn previous_version_range(major: u64) -> VersionRange {
    VersionRange::for_major(major)
}

/// Resolve the version to compare against.
///
/// A non-blank `explicit` version is returned as-is without touching the
/// repository. Otherwise the highest release in the current major series
/// wins. A repository error and an empty range are handled alike: skip when
/// `skip_first_in_series` is set, fail otherwise.
pub fn resolve_previous_version(
    repo: &dyn ArtifactRepository,
    major: u64,
    explicit: Option<&str>,
    group_id: &str,
    artifact_id: &str,
    skip_first_in_series: bool,
) -> Result<Resolution, CheckError> {
    if let Some(version) = non_blank(explicit) {
        return Ok(Resolution::Version(version.trim().to_string()));
    }

    let range = previous_version_range(major);
    let failure = match repo.resolve_highest_version(group_id, artifact_id, &range) {
        Ok(Some(version)) => return Ok(Resolution::Version(version)),
        Ok(None) => None,
        Err(e) => Some(e),
    };

    if skip_first_in_series {
        return Ok(Resolution::FirstInSeries);
    }

    Err(CheckError::Resolution {
        message: format!(
            "unable to find a previous version of {group_id}:{artifact_id} in range {range}"
        ),
        source: failure,
    })
}

/// Local file of the previous artifact.
pub fn resolve_previous_artifact(
    repo: &dyn ArtifactRepository,
    group_id: &str,
    artifact_id: &str,
    version: &str,
) -> Result<(ArtifactCoordinate, PathBuf), CheckError> {
    let coordinate = ArtifactCoordinate::new(group_id, artifact_id, version).map_err(|source| {
        CheckError::InvalidCoordinate {
            coordinate: format!("{group_id}:{artifact_id}:{version}"),
            source,
        }
    })?;
    let path = repo
        .resolve_artifact_file(&coordinate)
        .map_err(|source| CheckError::Resolution {
            message: format!("unable to resolve artifact {coordinate}"),
            source: Some(source),
        })?;
    Ok((coordinate, path))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    use apicompat_repository::{
        ArtifactCoordinate, ArtifactRepository, MavenVersion, RepositoryError, VersionRange,
    };

    /// In-memory repository that records the queries it receives.
    #[derive(Default)]
    pub(crate) struct FakeRepository {
        pub versions: Vec<String>,
        pub fail: bool,
        pub version_queries: Cell<usize>,
        pub ranges: RefCell<Vec<String>>,
        pub jar_dir: PathBuf,
    }

    impl FakeRepository {
        pub(crate) fn with_versions(versions: &[&str]) -> Self {
            Self {
                versions: versions.iter().map(|v| v.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl ArtifactRepository for FakeRepository {
        fn resolve_highest_version(
            &self,
            _group_id: &str,
            _artifact_id: &str,
            range: &VersionRange,
        ) -> Result<Option<String>, RepositoryError> {
            self.version_queries.set(self.version_queries.get() + 1);
            self.ranges.borrow_mut().push(range.to_string());
            if self.fail {
                return Err(RepositoryError::NotFound("metadata".to_string()));
            }
            Ok(self
                .versions
                .iter()
                .map(|v| MavenVersion::parse(v))
                .filter(|v| range.contains(v))
                .max()
                .map(|v| v.to_string()))
        }

        fn resolve_artifact_file(
            &self,
            coordinate: &ArtifactCoordinate,
        ) -> Result<PathBuf, RepositoryError> {
            if self.versions.iter().any(|v| v == coordinate.version()) {
                Ok(self.jar_dir.join(coordinate.file_name()))
            } else {
                Err(RepositoryError::NotFound(coordinate.to_string()))
            }
        }
    }
}
