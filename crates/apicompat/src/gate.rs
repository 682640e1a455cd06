//! Decides whether a compatibility check should run at all.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::CheckError;
use crate::types::SUPPORTED_PACKAGING;

/// A project version split on `.`. Only `major` drives any decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSpec {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionSpec {
    /// Parse a project version such as `2.3.1` or `2.3.1-SNAPSHOT`.
    ///
    /// The first segment must be a non-negative integer. Minor and patch are
    /// best effort: their leading digits, or zero.
    pub fn parse(version: &str) -> Result<Self, CheckError> {
        let mut segments = version.trim().split('.');
        let first = segments.next().unwrap_or_default();
        if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CheckError::configuration(format!(
                "unable to parse major version from project version '{version}'"
            )));
        }
        let major = first.parse::<u64>().map_err(|_| {
            CheckError::configuration(format!(
                "major version of '{version}' is out of range"
            ))
        })?;
        let minor = segments.next().map_or(0, leading_number);
        let patch = segments.next().map_or(0, leading_number);
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

fn leading_number(segment: &str) -> u64 {
    let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Why a check is not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedPackaging(String),
    Disabled,
    /// Major version zero is never compared against an earlier release.
    PreRelease,
    /// The interpreter is unusable and failures are tolerated.
    InvalidEnvironment(String),
    MissingArtifact(PathBuf),
    /// No earlier release exists in this major series.
    FirstInSeries { major: u64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPackaging(p) => {
                write!(f, "packaging '{p}' is not supported, only '{SUPPORTED_PACKAGING}'")
            }
            Self::Disabled => write!(f, "check is disabled"),
            Self::PreRelease => write!(f, "major version 0 is not checked for compatibility"),
            Self::InvalidEnvironment(msg) => write!(f, "{msg}"),
            Self::MissingArtifact(p) => write!(f, "artifact {} does not exist", p.display()),
            Self::FirstInSeries { major } => {
                write!(f, "no earlier release in the {major}.x series")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunDecision {
    Run {
        version: VersionSpec,
        interpreter: PathBuf,
    },
    Skip(SkipReason),
}

/// Gate order: packaging, explicit skip, version parse, major zero, interpreter.
///
/// An unparseable version is an error, not a skip. An unusable interpreter
/// is an error when `fail_on_error` is set and a skip otherwise.
pub fn should_run(
    packaging: &str,
    version: &str,
    skip: bool,
    interpreter: &Path,
    fail_on_error: bool,
) -> Result<RunDecision, CheckError> {
    if packaging != SUPPORTED_PACKAGING {
        return Ok(RunDecision::Skip(SkipReason::UnsupportedPackaging(
            packaging.to_string(),
        )));
    }
    if skip {
        return Ok(RunDecision::Skip(SkipReason::Disabled));
    }

    let spec = VersionSpec::parse(version)?;
    if spec.major == 0 {
        return Ok(RunDecision::Skip(SkipReason::PreRelease));
    }

    match locate_interpreter(interpreter) {
        Ok(interpreter) => Ok(RunDecision::Run {
            version: spec,
            interpreter,
        }),
        Err(message) if fail_on_error => Err(CheckError::InvalidEnvironment { message }),
        Err(message) => Ok(RunDecision::Skip(SkipReason::InvalidEnvironment(message))),
    }
}

/// Absolute path of a usable interpreter.
///
/// A bare name such as `perl` is looked up on `PATH`.
pub fn locate_interpreter(interpreter: &Path) -> Result<PathBuf, String> {
    let is_bare = interpreter.components().count() == 1 && !interpreter.has_root();
    if is_bare {
        return which::which(interpreter)
            .map_err(|_| format!("{} was not found on PATH", interpreter.display()));
    }
    if !interpreter.is_file() {
        return Err(format!("{} does not exist", interpreter.display()));
    }
    if !is_executable(interpreter) {
        return Err(format!("{} is not executable", interpreter.display()));
    }
    std::path::absolute(interpreter).map_err(|e| format!("{}: {e}", interpreter.display()))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_spec_parses_segments() {
        assert_eq!(
            VersionSpec::parse("2.3.1").expect("parse"),
            VersionSpec {
                major: 2,
                minor: 3,
                patch: 1
            }
        );
        assert_eq!(
            VersionSpec::parse("4.0.0-SNAPSHOT").expect("parse"),
            VersionSpec {
                major: 4,
                minor: 0,
                patch: 0
            }
        );
        assert_eq!(VersionSpec::parse("7").expect("parse").minor, 0);
    }

    #[test]
    fn non_numeric_major_is_a_configuration_error() {
        for bad in ["", "v1.0.0", "x.y.z", "1-SNAPSHOT", "-1.0.0"] {
            let err = VersionSpec::parse(bad).unwrap_err();
            assert!(err.is_configuration(), "{bad}: {err}");
        }
    }

    #[test]
    fn packaging_is_checked_first() {
        let d = should_run("pom", "garbage", false, Path::new("/missing"), true).expect("decision");
        assert_eq!(
            d,
            RunDecision::Skip(SkipReason::UnsupportedPackaging("pom".to_string()))
        );
    }

    #[test]
    fn skip_flag_wins_over_bad_version() {
        let d = should_run("jar", "garbage", true, Path::new("/missing"), true).expect("decision");
        assert_eq!(d, RunDecision::Skip(SkipReason::Disabled));
    }

    #[test]
    fn bad_version_is_fatal() {
        let err = should_run("jar", "garbage", false, Path::new("/missing"), false).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn major_zero_skips_even_without_interpreter() {
        let d = should_run("jar", "0.9.0", false, Path::new("/missing/perl"), true)
            .expect("decision");
        assert_eq!(d, RunDecision::Skip(SkipReason::PreRelease));
    }

    #[test]
    fn missing_interpreter_fails_or_skips_by_fail_on_error() {
        let missing = Path::new("/definitely/not/here/perl");
        let err = should_run("jar", "1.0.0", false, missing, true).unwrap_err();
        assert!(matches!(err, CheckError::InvalidEnvironment { .. }));

        let d = should_run("jar", "1.0.0", false, missing, false).expect("decision");
        assert!(matches!(d, RunDecision::Skip(SkipReason::InvalidEnvironment(_))));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_interpreter_is_rejected() {
        let td = tempfile::tempdir().expect("tempdir");
        let perl = td.path().join("perl");
        std::fs::write(&perl, "#!/bin/sh\n").expect("write");
        let err = locate_interpreter(&perl).unwrap_err();
        assert!(err.contains("not executable"));
    }

    #[cfg(unix)]
    #[test]
    fn executable_interpreter_runs() {
        use std::os::unix::fs::PermissionsExt;

        let td = tempfile::tempdir().expect("tempdir");
        let perl = td.path().join("perl");
        std::fs::write(&perl, "#!/bin/sh\n").expect("write");
        std::fs::set_permissions(&perl, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let d = should_run("jar", "3.1.4", false, &perl, true).expect("decision");
        assert_eq!(
            d,
            RunDecision::Run {
                version: VersionSpec {
                    major: 3,
                    minor: 1,
                    patch: 4
                },
                interpreter: perl,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_is_looked_up_on_path() {
        assert!(locate_interpreter(Path::new("sh")).is_ok());
        assert!(locate_interpreter(Path::new("no-such-interpreter-xyz")).is_err());
    }
}
