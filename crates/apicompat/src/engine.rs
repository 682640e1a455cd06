//! Chains gate, resolution, argument assembly, invocation and outcome.
//!
//! Progress goes through [`Reporter`]; nothing here prints. [`prepare_check`]
//! stops short of launching the tool and [`run_check`] goes all the way.
//! A raised [`Interrupt`] is honored between steps as well as while the
//! tool runs.

use std::ffi::OsString;
use std::path::PathBuf;

use apicompat_repository::{ArtifactCoordinate, ArtifactRepository};

use crate::args::{ArgumentList, build_arguments};
use crate::error::CheckError;
use crate::gate::{RunDecision, SkipReason, should_run};
use crate::outcome::{BuildOutcome, report_outcome};
use crate::process::{ExecutionResult, Interrupt, ProcessOrchestrator};
use crate::project::ProjectInfo;
use crate::resolve::{Resolution, resolve_previous_artifact, resolve_previous_version};
use crate::types::CompatibilityCheckConfig;

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
    fn debug(&mut self, _msg: &str) {}
}

/// Everything needed to launch the analysis tool.
#[derive(Debug, Clone)]
pub struct CheckPlan {
    pub previous: ArtifactCoordinate,
    pub previous_artifact: PathBuf,
    pub new_artifact: PathBuf,
    pub interpreter: PathBuf,
    pub script: PathBuf,
    pub arguments: ArgumentList,
}

impl CheckPlan {
    pub fn command_line(&self) -> Vec<OsString> {
        self.arguments.command_line(&self.interpreter, &self.script)
    }

    /// The command line as a single shell-quoted string, for display.
    pub fn display_command(&self) -> String {
        self.command_line()
            .iter()
            .map(|t| shell_quote(&t.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+".contains(c));
    if plain {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

#[derive(Debug, Clone)]
pub enum Preparation {
    Skip(SkipReason),
    Ready(CheckPlan),
}

#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Skipped(SkipReason),
    /// The tool ran. `outcome` is never [`BuildOutcome::Failure`]; that is
    /// returned as [`CheckError::AnalysisFailed`].
    Completed {
        outcome: BuildOutcome,
        result: ExecutionResult,
    },
}

/// Run every step up to, but not including, launching the tool.
///
/// Stages the output and report directories, extracts the analysis script
/// and writes the annotation list files.
pub fn prepare_check(
    project: &ProjectInfo,
    config: &CompatibilityCheckConfig,
    repo: &dyn ArtifactRepository,
    interrupt: &Interrupt,
    reporter: &mut dyn Reporter,
) -> Result<Preparation, CheckError> {
    let decision = should_run(
        &project.packaging,
        &project.version,
        config.skip,
        &config.interpreter,
        config.fail_on_error,
    );
    let (version, interpreter) = match decision {
        Ok(RunDecision::Run {
            version,
            interpreter,
        }) => (version, interpreter),
        Ok(RunDecision::Skip(reason)) => {
            report_skip(&reason, reporter);
            return Ok(Preparation::Skip(reason));
        }
        Err(e @ CheckError::InvalidEnvironment { .. }) => {
            reporter.error("cannot run the analysis tool");
            reporter.error(&e.to_string());
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let new_artifact = project.artifact_file();
    if !new_artifact.exists() {
        let reason = SkipReason::MissingArtifact(new_artifact);
        report_skip(&reason, reporter);
        return Ok(Preparation::Skip(reason));
    }

    let previous_version = match resolve_previous_version(
        repo,
        version.major,
        config.previous.version.as_deref(),
        &config.previous.group_id,
        &config.previous.artifact_id,
        config.skip_first_in_series,
    )? {
        Resolution::Version(v) => v,
        Resolution::FirstInSeries => {
            let reason = SkipReason::FirstInSeries {
                major: version.major,
            };
            report_skip(&reason, reporter);
            return Ok(Preparation::Skip(reason));
        }
    };

    checkpoint(interrupt, config)?;
    let (previous, previous_artifact) = resolve_previous_artifact(
        repo,
        &config.previous.group_id,
        &config.previous.artifact_id,
        &previous_version,
    )?;
    reporter.debug(&format!(
        "resolved previous artifact {previous} to {}",
        previous_artifact.display()
    ));

    checkpoint(interrupt, config)?;
    let orchestrator = ProcessOrchestrator::new(config, interrupt.clone());
    orchestrator.stage_directories()?;
    reporter.info("loading analysis script...");
    let script = orchestrator.prepare_script()?;
    let arguments = build_arguments(config, &previous_artifact, &new_artifact)?;

    let plan = CheckPlan {
        previous,
        previous_artifact,
        new_artifact,
        interpreter,
        script,
        arguments,
    };
    reporter.debug(&format!("executing: {}", plan.display_command()));
    Ok(Preparation::Ready(plan))
}

/// Run a full compatibility check.
///
/// Skips are `Ok`. A failed analysis with `fail_on_error` set is
/// `Err(CheckError::AnalysisFailed)`.
pub fn run_check(
    project: &ProjectInfo,
    config: &CompatibilityCheckConfig,
    repo: &dyn ArtifactRepository,
    interrupt: &Interrupt,
    reporter: &mut dyn Reporter,
) -> Result<CheckOutcome, CheckError> {
    let plan = match prepare_check(project, config, repo, interrupt, reporter)? {
        Preparation::Skip(reason) => return Ok(CheckOutcome::Skipped(reason)),
        Preparation::Ready(plan) => plan,
    };

    reporter.info(&format!(
        "checking API of {} against {}...",
        project.coordinate_string(),
        plan.previous
    ));
    let orchestrator = ProcessOrchestrator::new(config, interrupt.clone());
    let result = orchestrator.invoke(&plan.interpreter, &plan.script, &plan.arguments)?;
    reporter.info(&format!("API check done ({})", result.display_duration()));
    reporter.debug(&format!("analysis exit code: {}", result.exit_code));
    for line in result.stdout.iter().chain(result.stderr.iter()).flat_map(|s| s.lines()) {
        reporter.debug(line);
    }

    let report_path = config.report_path.as_deref();
    let outcome = report_outcome(&result, config.fail_on_error, report_path);
    match outcome {
        BuildOutcome::Success => {}
        BuildOutcome::Warning(_) | BuildOutcome::Failure(_) => {
            if result.timed_out {
                reporter.error("API validation timed out");
            } else {
                reporter.error("API validation FAILED");
            }
            if let Some(path) = report_path {
                reporter.error(&format!("report available at: file://{}", path.display()));
            }
        }
    }

    match outcome {
        BuildOutcome::Failure(message) => Err(CheckError::AnalysisFailed { message }),
        BuildOutcome::Warning(message) => {
            reporter.warn("ignoring incompatible API, fail_on_error is false");
            Ok(CheckOutcome::Completed {
                outcome: BuildOutcome::Warning(message),
                result,
            })
        }
        BuildOutcome::Success => Ok(CheckOutcome::Completed {
            outcome: BuildOutcome::Success,
            result,
        }),
    }
}

/// Stop between steps once an interrupt was raised.
fn checkpoint(
    interrupt: &Interrupt,
    config: &CompatibilityCheckConfig,
) -> Result<(), CheckError> {
    if interrupt.is_raised() {
        return Err(CheckError::Interrupted {
            program: config.interpreter.display().to_string(),
        });
    }
    Ok(())
}

fn report_skip(reason: &SkipReason, reporter: &mut dyn Reporter) {
    match reason {
        SkipReason::InvalidEnvironment(msg) => {
            reporter.error("cannot run the analysis tool");
            reporter.error(msg);
            reporter.warn("invalid execution environment, skipping");
        }
        SkipReason::MissingArtifact(_) => reporter.warn(&format!("skipping: {reason}")),
        SkipReason::FirstInSeries { .. } => reporter.debug(&format!(
            "no previous version resolved, assuming first in series, skipping: {reason}"
        )),
        _ => reporter.info(&format!("skipping: {reason}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::resolve::testing::FakeRepository;

    #[derive(Default)]
    struct CollectingReporter {
        infos: Vec<String>,
        warns: Vec<String>,
        errors: Vec<String>,
        debugs: Vec<String>,
    }

    impl Reporter for CollectingReporter {
        fn info(&mut self, msg: &str) {
            self.infos.push(msg.to_string());
        }

        fn warn(&mut self, msg: &str) {
            self.warns.push(msg.to_string());
        }

        fn error(&mut self, msg: &str) {
            self.errors.push(msg.to_string());
        }

        fn debug(&mut self, msg: &str) {
            self.debugs.push(msg.to_string());
        }
    }

    fn project(dir: &Path, version: &str) -> ProjectInfo {
        ProjectInfo {
            group_id: "org.example".to_string(),
            artifact_id: "demo".to_string(),
            version: version.to_string(),
            packaging: "jar".to_string(),
            name: "Demo".to_string(),
            base_dir: dir.to_path_buf(),
            build_directory: dir.join("target"),
            final_name: format!("demo-{version}"),
        }
    }

    fn build_jar(project: &ProjectInfo) {
        std::fs::create_dir_all(&project.build_directory).expect("mkdir");
        std::fs::write(project.artifact_file(), b"jar").expect("write jar");
    }

    #[test]
    fn collecting_reporter_debug_records_message() {
        let mut reporter = CollectingReporter::default();
        reporter.debug("trace");
        assert_eq!(reporter.debugs, vec!["trace".to_string()]);
    }

    #[test]
    fn pre_release_skips_before_any_resolution() {
        let td = tempfile::tempdir().expect("tempdir");
        let project = project(td.path(), "0.9.0");
        let config = CompatibilityCheckConfig::for_project(&project, None);
        let repo = FakeRepository::with_versions(&["0.8.0"]);
        let mut reporter = CollectingReporter::default();

        let outcome =
            run_check(&project, &config, &repo, &Interrupt::new(), &mut reporter).expect("ok");
        assert!(matches!(outcome, CheckOutcome::Skipped(SkipReason::PreRelease)));
        assert_eq!(repo.version_queries.get(), 0);
        assert!(!td.path().join("target").exists());
        assert!(reporter.infos.iter().any(|m| m.contains("major version 0")));
    }

    #[test]
    fn unsupported_packaging_is_logged_and_skipped() {
        let td = tempfile::tempdir().expect("tempdir");
        let mut project = project(td.path(), "1.0.0");
        project.packaging = "pom".to_string();
        let config = CompatibilityCheckConfig::for_project(&project, None);
        let mut reporter = CollectingReporter::default();

        let prep = prepare_check(
            &project,
            &config,
            &FakeRepository::default(),
            &Interrupt::new(),
            &mut reporter,
        )
        .expect("ok");
        assert!(matches!(
            prep,
            Preparation::Skip(SkipReason::UnsupportedPackaging(_))
        ));
        assert_eq!(reporter.infos.len(), 1);
    }

    #[test]
    fn invalid_interpreter_is_fatal_with_fail_on_error() {
        let td = tempfile::tempdir().expect("tempdir");
        let project = project(td.path(), "1.0.0");
        let mut config = CompatibilityCheckConfig::for_project(&project, None);
        config.interpreter = td.path().join("no-perl");
        let mut reporter = CollectingReporter::default();

        let err = prepare_check(
            &project,
            &config,
            &FakeRepository::default(),
            &Interrupt::new(),
            &mut reporter,
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::InvalidEnvironment { .. }));
        assert_eq!(reporter.errors.len(), 2);
    }

    #[test]
    fn invalid_interpreter_warns_and_skips_without_fail_on_error() {
        let td = tempfile::tempdir().expect("tempdir");
        let project = project(td.path(), "1.0.0");
        let mut config = CompatibilityCheckConfig::for_project(&project, None);
        config.interpreter = td.path().join("no-perl");
        config.fail_on_error = false;
        let mut reporter = CollectingReporter::default();

        let prep = prepare_check(
            &project,
            &config,
            &FakeRepository::default(),
            &Interrupt::new(),
            &mut reporter,
        )
        .expect("ok");
        assert!(matches!(
            prep,
            Preparation::Skip(SkipReason::InvalidEnvironment(_))
        ));
        assert_eq!(reporter.warns.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn missing_built_jar_is_a_warning_skip() {
        let td = tempfile::tempdir().expect("tempdir");
        let project = project(td.path(), "1.2.0");
        let mut config = CompatibilityCheckConfig::for_project(&project, None);
        config.interpreter = PathBuf::from("/bin/sh");
        let mut reporter = CollectingReporter::default();

        let prep = prepare_check(
            &project,
            &config,
            &FakeRepository::default(),
            &Interrupt::new(),
            &mut reporter,
        )
        .expect("ok");
        assert!(matches!(prep, Preparation::Skip(SkipReason::MissingArtifact(_))));
        assert_eq!(reporter.warns.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn first_in_series_skips_without_staging() {
        let td = tempfile::tempdir().expect("tempdir");
        let project = project(td.path(), "2.0.0");
        build_jar(&project);
        let mut config = CompatibilityCheckConfig::for_project(&project, None);
        config.interpreter = PathBuf::from("/bin/sh");
        config.skip_first_in_series = true;
        let repo = FakeRepository::with_versions(&["1.4.0"]);
        let mut reporter = CollectingReporter::default();

        let outcome =
            run_check(&project, &config, &repo, &Interrupt::new(), &mut reporter).expect("ok");
        assert!(matches!(
            outcome,
            CheckOutcome::Skipped(SkipReason::FirstInSeries { major: 2 })
        ));
        assert_eq!(repo.ranges.borrow().as_slice(), ["[2.0.0, 3.0.0)"]);
        assert!(!td.path().join("target/japi-compliance-checker.pl").exists());
        assert!(reporter.debugs.iter().any(|m| m.contains("first in series")));
    }

    #[cfg(unix)]
    #[test]
    fn prepare_builds_a_complete_plan() {
        let td = tempfile::tempdir().expect("tempdir");
        let project = project(td.path(), "1.3.0");
        build_jar(&project);
        let mut config = CompatibilityCheckConfig::for_project(&project, None);
        config.interpreter = PathBuf::from("/bin/sh");
        let repo = FakeRepository {
            versions: vec!["1.0.0".to_string(), "1.2.5".to_string()],
            jar_dir: PathBuf::from("/repo"),
            ..Default::default()
        };
        let mut reporter = CollectingReporter::default();

        let Preparation::Ready(plan) =
            prepare_check(&project, &config, &repo, &Interrupt::new(), &mut reporter)
                .expect("ok")
        else {
            panic!("expected a plan");
        };
        assert_eq!(plan.previous.to_string(), "org.example:demo:1.2.5");
        assert_eq!(plan.previous_artifact, PathBuf::from("/repo/demo-1.2.5.jar"));
        assert_eq!(plan.new_artifact, project.artifact_file());
        assert_eq!(plan.script, td.path().join("target/japi-compliance-checker.pl"));
        let line = plan.command_line();
        assert_eq!(line[0], OsString::from("/bin/sh"));
        assert_eq!(line[line.len() - 2], OsString::from("/repo/demo-1.2.5.jar"));
        assert!(td.path().join("target/site/japicc").is_dir());
        assert!(reporter.debugs.iter().any(|m| m.starts_with("executing: /bin/sh")));
    }

    /// Raises the interrupt while the previous version is being looked up.
    struct InterruptingRepository {
        inner: FakeRepository,
        interrupt: Interrupt,
    }

    impl ArtifactRepository for InterruptingRepository {
        fn resolve_highest_version(
            &self,
            group_id: &str,
            artifact_id: &str,
            range: &apicompat_repository::VersionRange,
        ) -> Result<Option<String>, apicompat_repository::RepositoryError> {
            self.interrupt.raise();
            self.inner
                .resolve_highest_version(group_id, artifact_id, range)
        }

        fn resolve_artifact_file(
            &self,
            coordinate: &ArtifactCoordinate,
        ) -> Result<PathBuf, apicompat_repository::RepositoryError> {
            self.inner.resolve_artifact_file(coordinate)
        }
    }

    #[test]
    fn interrupt_during_resolution_stops_before_staging() {
        let td = tempfile::tempdir().expect("tempdir");
        let project = project(td.path(), "1.3.0");
        build_jar(&project);
        let mut config = CompatibilityCheckConfig::for_project(&project, None);
        config.interpreter = PathBuf::from("/bin/sh");
        let interrupt = Interrupt::new();
        let repo = InterruptingRepository {
            inner: FakeRepository {
                versions: vec!["1.2.0".to_string()],
                jar_dir: PathBuf::from("/repo"),
                ..Default::default()
            },
            interrupt: interrupt.clone(),
        };

        let err = run_check(
            &project,
            &config,
            &repo,
            &interrupt,
            &mut CollectingReporter::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::Interrupted { .. }));
        assert!(!td.path().join("target/japi-compliance-checker.pl").exists());
        assert!(!td.path().join("target/site").exists());
    }

    #[test]
    fn shell_quote_only_quotes_when_needed() {
        assert_eq!(shell_quote("/usr/bin/perl"), "/usr/bin/perl");
        assert_eq!(shell_quote("-skip-deprecated"), "-skip-deprecated");
        assert_eq!(shell_quote("My Lib"), "'My Lib'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
