use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use apicompat::CheckError;
use apicompat::config::{self, CliOverrides, FileConfig, HostEnvironment};
use apicompat::engine::{self, CheckOutcome, CheckPlan, Preparation, Reporter};
use apicompat::outcome::BuildOutcome;
use apicompat::process::Interrupt;
use apicompat::project::ProjectInfo;

#[derive(Parser, Debug)]
#[command(name = "apicompat", version)]
#[command(about = "Check a Maven library's API against its previous release")]
struct Cli {
    /// Path to the project's pom.xml
    #[arg(long, default_value = "pom.xml")]
    pom: PathBuf,

    /// Config file (default: .apicompat.toml next to the pom, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compare against this version instead of resolving the latest release of the series.
    #[arg(long)]
    previous_version: Option<String>,

    /// groupId of the previous artifact (default: the project's groupId)
    #[arg(long)]
    previous_group_id: Option<String>,

    /// artifactId of the previous artifact (default: the project's artifactId)
    #[arg(long)]
    previous_artifact_id: Option<String>,

    /// Do nothing.
    #[arg(long)]
    skip: bool,

    /// Report incompatibilities as a warning instead of failing.
    #[arg(long)]
    no_fail_on_error: bool,

    /// Skip instead of failing when the major series has no earlier release.
    #[arg(long)]
    skip_first_in_series: bool,

    /// Perl interpreter (path or name on PATH)
    #[arg(long)]
    perl: Option<PathBuf>,

    /// Analysis script to run instead of the bundled launcher.
    #[arg(long)]
    script: Option<PathBuf>,

    /// JDK passed to the analysis tool (default: JAVA_HOME)
    #[arg(long)]
    jdk_path: Option<String>,

    /// Report title (default: the project name)
    #[arg(long)]
    title: Option<String>,

    /// Where to write the HTML report.
    #[arg(long)]
    report_path: Option<PathBuf>,

    /// Local Maven repository (default: ~/.m2/repository)
    #[arg(long)]
    local_repo: Option<PathBuf>,

    /// Remote Maven repository base URL (repeatable). Replaces the configured remotes.
    #[arg(long = "remote-repo")]
    remote_repos: Vec<String>,

    /// Only consult the local repository.
    #[arg(long)]
    offline: bool,

    /// Kill the analysis after this long (e.g. 90s, 10m)
    #[arg(long)]
    timeout: Option<String>,

    /// Capture the tool's output and show it with --verbose instead of streaming it.
    #[arg(long)]
    capture_output: bool,

    /// Print debug messages.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the compatibility check.
    Check,
    /// Resolve the previous release and print the command that would run.
    Plan,
    /// Write a starter .apicompat.toml next to the pom.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
}

struct CliReporter {
    verbose: bool,
}

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }

    fn debug(&mut self, msg: &str) {
        if self.verbose {
            eprintln!("[debug] {msg}");
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[error] {err:#}");
            if matches!(
                err.downcast_ref::<CheckError>(),
                Some(CheckError::Interrupted { .. })
            ) {
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { force } = cli.cmd {
        return init_config(&cli.pom, force);
    }

    let project = ProjectInfo::load(&cli.pom)?;
    let file = match &cli.config {
        Some(path) => FileConfig::load_from_file(path)?,
        None => FileConfig::load_from_project(&project.base_dir)?.unwrap_or_default(),
    };
    let overrides = CliOverrides {
        previous_group_id: cli.previous_group_id,
        previous_artifact_id: cli.previous_artifact_id,
        previous_version: cli.previous_version,
        skip: cli.skip,
        no_fail_on_error: cli.no_fail_on_error,
        skip_first_in_series: cli.skip_first_in_series,
        perl: cli.perl,
        script: cli.script,
        jdk_path: cli.jdk_path,
        title: cli.title,
        report_path: cli.report_path,
        timeout: cli.timeout.as_deref().map(parse_duration).transpose()?,
        capture_output: cli.capture_output,
        local_repo: cli.local_repo,
        remote_repos: cli.remote_repos,
        offline: cli.offline,
    };
    let settings =
        config::resolve_settings(&project, &file, overrides, &HostEnvironment::capture())?;
    let repo = settings
        .repository
        .open()
        .context("failed to open Maven repository")?;

    let mut reporter = CliReporter {
        verbose: cli.verbose,
    };
    let interrupt = Interrupt::new();
    install_interrupt_handler(interrupt.clone());

    if matches!(cli.cmd, Commands::Plan) {
        match engine::prepare_check(&project, &settings.check, &repo, &interrupt, &mut reporter)? {
            Preparation::Skip(reason) => println!("skipped: {reason}"),
            Preparation::Ready(plan) => print_plan(&project, &plan),
        }
    } else {
        let outcome =
            engine::run_check(&project, &settings.check, &repo, &interrupt, &mut reporter)?;
        print_outcome(&outcome);
    }

    Ok(())
}

/// Raise `interrupt` on Ctrl-C. The pipeline stops at its next step, or kills
/// and reaps the analysis if it is already running.
fn install_interrupt_handler(interrupt: Interrupt) {
    std::thread::spawn(move || {
        let Ok(rt) = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        else {
            return;
        };
        rt.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.raise();
            }
        });
    });
}

fn init_config(pom: &Path, force: bool) -> Result<()> {
    let dir = match pom.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let path = dir.join(config::CONFIG_FILE);
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(&path, FileConfig::default_toml_template())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))
}

fn print_outcome(outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Skipped(reason) => println!("skipped: {reason}"),
        CheckOutcome::Completed { outcome, result } => {
            match outcome {
                BuildOutcome::Success => println!("result: compatible"),
                BuildOutcome::Warning(message) | BuildOutcome::Failure(message) => {
                    println!("result: incompatible (tolerated)");
                    println!("details: {message}");
                }
            }
            println!("exit_code: {}", result.exit_code);
            println!("duration: {}", result.display_duration());
        }
    }
}

fn print_plan(project: &ProjectInfo, plan: &CheckPlan) {
    println!("project: {}", project.coordinate_string());
    println!("previous: {}", plan.previous);
    println!("previous_artifact: {}", plan.previous_artifact.display());
    println!("new_artifact: {}", plan.new_artifact.display());
    println!("command: {}", plan.display_command());
}
