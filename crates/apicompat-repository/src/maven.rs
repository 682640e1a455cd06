use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::coordinate::artifact_directory;
use crate::version::{MavenVersion, VersionRange};
use crate::{ArtifactCoordinate, ArtifactRepository, RepositoryError};

pub const MAVEN_CENTRAL: &str = "https://repo.maven.apache.org/maven2";

const METADATA_FILE: &str = "maven-metadata.xml";

/// A local Maven-layout repository in front of zero or more remote ones.
///
/// Remote repositories are consulted in order. Downloaded jars are stored in
/// the local repository so later lookups stay offline.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    local: PathBuf,
    remotes: Vec<String>,
    http: Client,
}

impl MavenRepository {
    pub fn new(local: PathBuf, remotes: Vec<String>) -> Result<Self, RepositoryError> {
        let http = Client::builder()
            .user_agent(format!("apicompat/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RepositoryError::Http {
                url: "<client>".to_string(),
                source,
            })?;

        Ok(Self {
            local,
            remotes: remotes
                .into_iter()
                .map(|r| r.trim_end_matches('/').to_string())
                .collect(),
            http,
        })
    }

    /// `~/.m2/repository`, when a home directory is known.
    pub fn default_local_repository() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".m2").join("repository"))
    }

    pub fn local(&self) -> &Path {
        &self.local
    }

    pub fn remotes(&self) -> &[String] {
        &self.remotes
    }

    fn local_versions(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let dir = self.local.join(artifact_directory(group_id, artifact_id));
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(RepositoryError::Io { path: dir, source }),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RepositoryError::Io {
                path: dir.clone(),
                source,
            })?;
            let Some(version) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let jar = entry.path().join(format!("{artifact_id}-{version}.jar"));
            if jar.is_file() {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    fn remote_versions(
        &self,
        base: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let url = format!(
            "{base}/{}/{METADATA_FILE}",
            artifact_directory(group_id, artifact_id)
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|source| RepositoryError::Http {
                url: url.clone(),
                source,
            })?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp.text().map_err(|source| RepositoryError::Http {
                    url: url.clone(),
                    source,
                })?;
                parse_metadata_versions(&body).map_err(|message| RepositoryError::Metadata {
                    location: url,
                    message,
                })
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s => Err(RepositoryError::Status {
                url,
                status: s.as_u16(),
            }),
        }
    }

    /// Returns `Ok(false)` when the remote does not have the artifact.
    fn download(
        &self,
        base: &str,
        coordinate: &ArtifactCoordinate,
        dest: &Path,
    ) -> Result<bool, RepositoryError> {
        let url = format!("{base}/{}", coordinate.repository_path());
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|source| RepositoryError::Http {
                url: url.clone(),
                source,
            })?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Ok(false),
            s => {
                return Err(RepositoryError::Status {
                    url,
                    status: s.as_u16(),
                });
            }
        }

        let bytes = resp.bytes().map_err(|source| RepositoryError::Http {
            url: url.clone(),
            source,
        })?;

        let parent = dest.parent().unwrap_or(Path::new("."));
        let io_err = |source| RepositoryError::Io {
            path: dest.to_path_buf(),
            source,
        };
        fs::create_dir_all(parent).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(dest).map_err(|e| io_err(e.error))?;
        Ok(true)
    }
}

impl ArtifactRepository for MavenRepository {
    fn resolve_highest_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        range: &VersionRange,
    ) -> Result<Option<String>, RepositoryError> {
        let mut candidates = self.local_versions(group_id, artifact_id)?;
        let mut remote_error = None;

        for base in &self.remotes {
            match self.remote_versions(base, group_id, artifact_id) {
                Ok(versions) => candidates.extend(versions),
                Err(e) => remote_error = Some(e),
            }
        }

        let highest = candidates
            .iter()
            .map(|v| MavenVersion::parse(v))
            .filter(|v| !v.is_snapshot() && range.contains(v))
            .max();

        match (highest, remote_error) {
            (Some(v), _) => Ok(Some(v.to_string())),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(None),
        }
    }

    fn resolve_artifact_file(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<PathBuf, RepositoryError> {
        let local = self.local.join(coordinate.repository_path());
        if local.is_file() {
            return Ok(local);
        }

        for base in &self.remotes {
            if self.download(base, coordinate, &local)? {
                return Ok(local);
            }
        }

        Err(RepositoryError::NotFound(coordinate.to_string()))
    }
}

/// Versions listed under `<versioning><versions>` in a `maven-metadata.xml`.
pub(crate) fn parse_metadata_versions(xml: &str) -> Result<Vec<String>, String> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if root.tag_name().name() != "metadata" {
        return Err(format!(
            "expected <metadata> root element, found <{}>",
            root.tag_name().name()
        ));
    }

    let versions = root
        .children()
        .filter(|n| n.has_tag_name("versioning"))
        .flat_map(|n| n.children().filter(|c| c.has_tag_name("versions")))
        .flat_map(|n| n.children().filter(|c| c.has_tag_name("version")))
        .filter_map(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(versions)
}
