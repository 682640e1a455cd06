//! Check configuration and its defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::project::ProjectInfo;

/// The only packaging type the analysis tool understands.
pub const SUPPORTED_PACKAGING: &str = "jar";

/// Interpreter used to run the analysis script unless configured otherwise.
pub const DEFAULT_INTERPRETER: &str = "/usr/bin/perl";

/// Report directory relative to the build directory.
pub const REPORT_DIR: &str = "site/japicc";

/// Which artifact to compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousArtifact {
    pub group_id: String,
    pub artifact_id: String,
    /// Explicit previous version. `None` means "resolve from the repository".
    pub version: Option<String>,
}

/// What the analysis subprocess does with its standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// Share the parent's stdin/stdout/stderr so progress shows live.
    #[default]
    Inherit,
    /// Capture stdout/stderr into the execution result.
    Capture,
}

/// All options of one compatibility check.
///
/// Built once at the boundary (see [`crate::config::resolve_settings`]) and
/// only ever borrowed afterwards.
#[derive(Debug, Clone)]
pub struct CompatibilityCheckConfig {
    pub previous: PreviousArtifact,

    pub skip: bool,
    pub fail_on_error: bool,
    pub skip_first_in_series: bool,

    pub keep_internal: bool,
    pub skip_internal_packages: Option<String>,
    pub skip_internal_types: Option<String>,
    pub classes_list: Option<PathBuf>,
    pub annotations_list: Vec<String>,
    pub skip_annotations_list: Vec<String>,
    pub skip_deprecated: bool,
    pub skip_classes: Option<PathBuf>,
    pub skip_packages: Option<PathBuf>,
    pub added_annotations: bool,
    pub removed_annotations: bool,

    pub report_path: Option<PathBuf>,
    pub bin_report_path: Option<PathBuf>,
    pub src_report_path: Option<PathBuf>,
    pub title: Option<String>,
    pub quick: bool,
    pub sort: bool,
    pub show_access: bool,
    pub hide_templates: bool,
    pub show_packages: bool,
    /// Emitted only when greater than zero.
    pub limit_affected: i32,
    pub compact: bool,

    pub jdk_path: Option<String>,
    /// Interpreter that runs the analysis script.
    pub interpreter: PathBuf,
    /// Use this script instead of extracting the embedded one.
    pub analysis_script: Option<PathBuf>,
    /// Build output directory; holds the extracted script and list files.
    pub output_dir: PathBuf,
    pub timeout: Option<Duration>,
    pub stream_mode: StreamMode,
}

impl CompatibilityCheckConfig {
    /// Defaults derived from the project being built.
    pub fn for_project(project: &ProjectInfo, java_home: Option<String>) -> Self {
        let report_dir = project.build_directory.join(REPORT_DIR);
        Self {
            previous: PreviousArtifact {
                group_id: project.group_id.clone(),
                artifact_id: project.artifact_id.clone(),
                version: None,
            },
            skip: false,
            fail_on_error: true,
            skip_first_in_series: false,
            keep_internal: false,
            skip_internal_packages: None,
            skip_internal_types: None,
            classes_list: None,
            annotations_list: Vec::new(),
            skip_annotations_list: Vec::new(),
            skip_deprecated: true,
            skip_classes: None,
            skip_packages: None,
            added_annotations: false,
            removed_annotations: false,
            report_path: Some(report_dir.join("compat_report.html")),
            bin_report_path: Some(report_dir.join("bin_compat_report.html")),
            src_report_path: Some(report_dir.join("src_compat_report.html")),
            title: Some(project.name.clone()),
            quick: false,
            sort: false,
            show_access: false,
            hide_templates: false,
            show_packages: false,
            limit_affected: -1,
            compact: false,
            jdk_path: java_home,
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            analysis_script: None,
            output_dir: project.build_directory.clone(),
            timeout: None,
            stream_mode: StreamMode::Inherit,
        }
    }

    /// The three report paths that are configured.
    pub fn report_paths(&self) -> impl Iterator<Item = &Path> {
        [
            self.report_path.as_deref(),
            self.bin_report_path.as_deref(),
            self.src_report_path.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// `Some(s)` unless `s` is empty or whitespace.
pub(crate) fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

pub fn serialize_option_duration<S>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(d) => s.serialize_some(&humantime::format_duration(*d).to_string()),
        None => s.serialize_none(),
    }
}

pub fn deserialize_option_duration<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}
