use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A fully-qualified `groupId:artifactId:version` jar coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("{segment} must not be empty")]
    EmptySegment { segment: &'static str },

    #[error("{segment} '{value}' must not contain ':' or whitespace")]
    InvalidCharacter { segment: &'static str, value: String },

    #[error("expected groupId:artifactId:version, got '{0}'")]
    Malformed(String),
}

impl ArtifactCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, CoordinateError> {
        let group_id = validate_segment("groupId", group_id.into())?;
        let artifact_id = validate_segment("artifactId", artifact_id.into())?;
        let version = validate_segment("version", version.into())?;
        Ok(Self {
            group_id,
            artifact_id,
            version,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `<artifactId>-<version>.jar`
    pub fn file_name(&self) -> String {
        format!("{}-{}.jar", self.artifact_id, self.version)
    }

    /// Path of the jar relative to a repository root, `/`-separated.
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}",
            artifact_directory(&self.group_id, &self.artifact_id),
            self.version,
            self.file_name()
        )
    }
}

/// `<group as path>/<artifactId>`, the directory holding every version of an artifact.
pub(crate) fn artifact_directory(group_id: &str, artifact_id: &str) -> String {
    format!("{}/{}", group_id.replace('.', "/"), artifact_id)
}

fn validate_segment(segment: &'static str, value: String) -> Result<String, CoordinateError> {
    if value.is_empty() {
        return Err(CoordinateError::EmptySegment { segment });
    }
    if value.chars().any(|c| c == ':' || c.is_whitespace()) {
        return Err(CoordinateError::InvalidCharacter { segment, value });
    }
    Ok(value)
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version] => Self::new(*group, *artifact, *version),
            _ => Err(CoordinateError::Malformed(s.to_string())),
        }
    }
}
