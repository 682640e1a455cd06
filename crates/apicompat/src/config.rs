//! Configuration file support (`.apicompat.toml`).
//!
//! A check is configured from three layers, lowest first: defaults derived
//! from the project, the optional config file next to the `pom.xml`, and
//! command-line overrides. [`resolve_settings`] folds them into the immutable
//! [`CompatibilityCheckConfig`] used by the rest of the pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use apicompat_repository::{MAVEN_CENTRAL, MavenRepository, RepositoryError};
use serde::{Deserialize, Serialize};

use crate::project::ProjectInfo;
use crate::types::{
    CompatibilityCheckConfig, StreamMode, deserialize_option_duration, non_blank,
    serialize_option_duration,
};

pub const CONFIG_FILE: &str = ".apicompat.toml";

/// `[previous]`: the artifact to compare against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviousSection {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
    /// Pin the previous version instead of resolving it.
    #[serde(default)]
    pub version: Option<String>,
}

/// `[check]`: whether and how strictly to run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckSection {
    #[serde(default)]
    pub skip: Option<bool>,
    #[serde(default)]
    pub fail_on_error: Option<bool>,
    /// Skip instead of failing when no earlier release exists in the major series.
    #[serde(default)]
    pub skip_first_in_series: Option<bool>,
}

/// `[filters]`: what the analysis looks at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSection {
    #[serde(default)]
    pub keep_internal: Option<bool>,
    #[serde(default)]
    pub skip_internal_packages: Option<String>,
    #[serde(default)]
    pub skip_internal_types: Option<String>,
    #[serde(default)]
    pub classes_list: Option<PathBuf>,
    #[serde(default)]
    pub annotations_list: Vec<String>,
    #[serde(default)]
    pub skip_annotations_list: Vec<String>,
    #[serde(default)]
    pub skip_deprecated: Option<bool>,
    #[serde(default)]
    pub skip_classes: Option<PathBuf>,
    #[serde(default)]
    pub skip_packages: Option<PathBuf>,
    #[serde(default)]
    pub added_annotations: Option<bool>,
    #[serde(default)]
    pub removed_annotations: Option<bool>,
}

/// `[report]`: where reports go and what they show.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default)]
    pub report_path: Option<PathBuf>,
    #[serde(default)]
    pub bin_report_path: Option<PathBuf>,
    #[serde(default)]
    pub src_report_path: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub quick: Option<bool>,
    #[serde(default)]
    pub sort: Option<bool>,
    #[serde(default)]
    pub show_access: Option<bool>,
    #[serde(default)]
    pub hide_templates: Option<bool>,
    #[serde(default)]
    pub show_packages: Option<bool>,
    /// Values of zero or below disable the limit.
    #[serde(default)]
    pub limit_affected: Option<i32>,
    #[serde(default)]
    pub compact: Option<bool>,
}

/// `[tool]`: how the analysis tool is launched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSection {
    /// Interpreter running the analysis script (default: /usr/bin/perl)
    #[serde(default)]
    pub perl: Option<PathBuf>,
    /// Existing analysis script; disables extraction of the bundled one.
    #[serde(default)]
    pub script: Option<PathBuf>,
    #[serde(default)]
    pub jdk_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_option_duration",
        serialize_with = "serialize_option_duration"
    )]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub stream: Option<StreamMode>,
}

/// `[repository]`: where previous releases are looked up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositorySection {
    #[serde(default)]
    pub local: Option<PathBuf>,
    #[serde(default)]
    pub remotes: Option<Vec<String>>,
    /// Never contact remote repositories.
    #[serde(default)]
    pub offline: bool,
}

/// Configuration loaded from `.apicompat.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub previous: PreviousSection,
    #[serde(default)]
    pub check: CheckSection,
    #[serde(default)]
    pub filters: FilterSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub tool: ToolSection,
    #[serde(default)]
    pub repository: RepositorySection,
}

impl FileConfig {
    /// Load `.apicompat.toml` from the project directory.
    ///
    /// Returns `Ok(None)` if no config file exists.
    pub fn load_from_project(base_dir: &Path) -> Result<Option<Self>> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from_file(&path).map(Some)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tool.timeout.is_some_and(|t| t.is_zero()) {
            bail!("tool.timeout must be greater than 0");
        }

        for (key, value) in [
            ("previous.group_id", &self.previous.group_id),
            ("previous.artifact_id", &self.previous.artifact_id),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                bail!("{key} cannot be empty");
            }
        }

        if let Some(remotes) = &self.repository.remotes
            && remotes.iter().any(|r| r.trim().is_empty())
        {
            bail!("repository.remotes[] cannot be empty");
        }

        Ok(())
    }

    /// Content of a starter `.apicompat.toml`.
    pub fn default_toml_template() -> String {
        r#"# apicompat configuration file
# Every key is optional; the values shown are the defaults.

[previous]
# Compare against this artifact (default: the project's own coordinates)
# group_id = "org.example"
# artifact_id = "demo"
# Pin the previous version instead of resolving the latest release
# of the current major series
# version = "1.2.0"

[check]
skip = false
# Fail the build when the analysis reports incompatibilities
fail_on_error = true
# Skip instead of failing when the series has no earlier release
skip_first_in_series = false

[filters]
keep_internal = false
skip_deprecated = true
added_annotations = false
removed_annotations = false
# skip_internal_packages = ".*\\.internal\\..*"
# skip_internal_types = ".*Impl"
# annotations_list = ["org.example.PublicApi"]
# skip_annotations_list = ["org.example.Beta"]
# classes_list = "api-classes.txt"
# skip_classes = "skip-classes.txt"
# skip_packages = "skip-packages.txt"

[report]
# title = "Demo"
# report_path = "target/site/japicc/compat_report.html"
quick = false
sort = false
show_access = false
hide_templates = false
show_packages = false
compact = false
limit_affected = -1

[tool]
# perl = "/usr/bin/perl"
# script = "/opt/japi-compliance-checker/japi-compliance-checker.pl"
# jdk_path = "/usr/lib/jvm/java-17"
# Kill the analysis if it runs longer than this
# timeout = "10m"
# inherit or capture
stream = "inherit"

[repository]
# local = "~/.m2/repository"
# remotes = ["https://repo.maven.apache.org/maven2"]
offline = false
"#
        .to_string()
    }
}

/// CLI overrides for merging with config file values.
///
/// `Option` fields mean "user did not pass this flag" when `None`.
/// `bool` fields mean "user explicitly enabled this" when `true`.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub previous_group_id: Option<String>,
    pub previous_artifact_id: Option<String>,
    pub previous_version: Option<String>,
    pub skip: bool,
    pub no_fail_on_error: bool,
    pub skip_first_in_series: bool,
    pub perl: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub jdk_path: Option<String>,
    pub title: Option<String>,
    pub report_path: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub capture_output: bool,
    pub local_repo: Option<PathBuf>,
    pub remote_repos: Vec<String>,
    pub offline: bool,
}

/// Values read from the process environment, captured once at startup.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    pub java_home: Option<String>,
    pub local_repository: Option<PathBuf>,
}

impl HostEnvironment {
    pub fn capture() -> Self {
        Self {
            java_home: std::env::var("JAVA_HOME").ok(),
            local_repository: MavenRepository::default_local_repository(),
        }
    }
}

/// Where previous releases come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub local: PathBuf,
    pub remotes: Vec<String>,
}

impl RepositorySettings {
    pub fn open(&self) -> Result<MavenRepository, RepositoryError> {
        MavenRepository::new(self.local.clone(), self.remotes.clone())
    }
}

/// Fully merged settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub check: CompatibilityCheckConfig,
    pub repository: RepositorySettings,
}

/// Merge project defaults, the config file and CLI overrides.
///
/// For `Option` fields the CLI wins, then the file, then the default.
/// Relative paths from the config file are taken relative to the project
/// directory; CLI paths are left as given.
pub fn resolve_settings(
    project: &ProjectInfo,
    file: &FileConfig,
    cli: CliOverrides,
    env: &HostEnvironment,
) -> Result<Settings> {
    file.validate()?;
    if cli.timeout.is_some_and(|t| t.is_zero()) {
        bail!("--timeout must be greater than 0");
    }

    let base = project.base_dir.as_path();
    let file_path = |p: &Option<PathBuf>| p.as_ref().map(|p| relative_to(base, p));

    let mut check = CompatibilityCheckConfig::for_project(project, env.java_home.clone());

    if let Some(group) = cli.previous_group_id.or(file.previous.group_id.clone()) {
        check.previous.group_id = group;
    }
    if let Some(artifact) = cli.previous_artifact_id.or(file.previous.artifact_id.clone()) {
        check.previous.artifact_id = artifact;
    }
    check.previous.version = non_blank(
        cli.previous_version
            .as_deref()
            .or(file.previous.version.as_deref()),
    )
    .map(str::to_string);

    check.skip = cli.skip || file.check.skip.unwrap_or(check.skip);
    check.fail_on_error =
        !cli.no_fail_on_error && file.check.fail_on_error.unwrap_or(check.fail_on_error);
    check.skip_first_in_series = cli.skip_first_in_series
        || file
            .check
            .skip_first_in_series
            .unwrap_or(check.skip_first_in_series);

    let filters = &file.filters;
    check.keep_internal = filters.keep_internal.unwrap_or(check.keep_internal);
    check.skip_internal_packages =
        non_blank(filters.skip_internal_packages.as_deref()).map(str::to_string);
    check.skip_internal_types =
        non_blank(filters.skip_internal_types.as_deref()).map(str::to_string);
    check.classes_list = file_path(&filters.classes_list);
    check.annotations_list = filters.annotations_list.clone();
    check.skip_annotations_list = filters.skip_annotations_list.clone();
    check.skip_deprecated = filters.skip_deprecated.unwrap_or(check.skip_deprecated);
    check.skip_classes = file_path(&filters.skip_classes);
    check.skip_packages = file_path(&filters.skip_packages);
    check.added_annotations = filters.added_annotations.unwrap_or(check.added_annotations);
    check.removed_annotations = filters
        .removed_annotations
        .unwrap_or(check.removed_annotations);

    let report = &file.report;
    if let Some(p) = cli.report_path.or_else(|| file_path(&report.report_path)) {
        check.report_path = Some(p);
    }
    if let Some(p) = file_path(&report.bin_report_path) {
        check.bin_report_path = Some(p);
    }
    if let Some(p) = file_path(&report.src_report_path) {
        check.src_report_path = Some(p);
    }
    match cli.title.as_deref().or(report.title.as_deref()) {
        Some(t) => check.title = non_blank(Some(t)).map(str::to_string),
        None => check.title = non_blank(check.title.as_deref()).map(str::to_string),
    }
    check.quick = report.quick.unwrap_or(check.quick);
    check.sort = report.sort.unwrap_or(check.sort);
    check.show_access = report.show_access.unwrap_or(check.show_access);
    check.hide_templates = report.hide_templates.unwrap_or(check.hide_templates);
    check.show_packages = report.show_packages.unwrap_or(check.show_packages);
    check.limit_affected = report.limit_affected.unwrap_or(check.limit_affected);
    check.compact = report.compact.unwrap_or(check.compact);

    let tool = &file.tool;
    if let Some(perl) = cli.perl.or_else(|| tool.perl.clone()) {
        check.interpreter = perl;
    }
    check.analysis_script = cli.script.or_else(|| file_path(&tool.script));
    let jdk = cli
        .jdk_path
        .or(tool.jdk_path.clone())
        .or(check.jdk_path.take());
    check.jdk_path = non_blank(jdk.as_deref()).map(str::to_string);
    check.timeout = cli.timeout.or(tool.timeout);
    check.stream_mode = if cli.capture_output {
        StreamMode::Capture
    } else {
        tool.stream.unwrap_or(check.stream_mode)
    };

    let repository = resolve_repository(
        base,
        &file.repository,
        cli.local_repo,
        cli.remote_repos,
        cli.offline,
        env,
    )?;

    Ok(Settings { check, repository })
}

fn resolve_repository(
    base: &Path,
    section: &RepositorySection,
    cli_local: Option<PathBuf>,
    cli_remotes: Vec<String>,
    cli_offline: bool,
    env: &HostEnvironment,
) -> Result<RepositorySettings> {
    let local = cli_local
        .or_else(|| section.local.as_ref().map(|p| relative_to(base, p)))
        .or_else(|| env.local_repository.clone())
        .context("cannot determine the local Maven repository; pass --local-repo")?;

    let remotes = if cli_offline || section.offline {
        Vec::new()
    } else if !cli_remotes.is_empty() {
        cli_remotes
    } else {
        section
            .remotes
            .clone()
            .unwrap_or_else(|| vec![MAVEN_CENTRAL.to_string()])
    };

    Ok(RepositorySettings { local, remotes })
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
