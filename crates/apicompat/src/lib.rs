//! # apicompat
//!
//! Runs the Java API Compliance Checker against the previous release of a
//! Maven library and turns its verdict into a build outcome.
//!
//! ## Pipeline
//!
//! The core flow is **gate → resolve → assemble → invoke → report**:
//!
//! 1. [`gate::should_run`] decides whether a check applies at all: jar
//!    packaging, not disabled, major version above zero, usable interpreter.
//! 2. [`resolve::resolve_previous_version`] takes the explicitly configured
//!    previous version or the highest release in `[major.0.0, (major+1).0.0)`.
//! 3. [`args::build_arguments`] turns the configuration into the tool's
//!    command line in a fixed order and writes the annotation list files.
//! 4. [`process::ProcessOrchestrator`] stages directories, extracts the
//!    bundled script and runs the tool with a bounded, interruptible wait.
//! 5. [`outcome::report_outcome`] maps the exit status to success, warning
//!    or failure.
//!
//! [`engine::run_check`] chains the steps and reports progress through the
//! [`engine::Reporter`] trait.
//!
//! ## Example
//!
//! ```ignore
//! use apicompat::{config, engine, process::Interrupt, project::ProjectInfo};
//!
//! let project = ProjectInfo::load(Path::new("pom.xml"))?;
//! let file = config::FileConfig::load_from_project(&project.base_dir)?.unwrap_or_default();
//! let settings = config::resolve_settings(
//!     &project,
//!     &file,
//!     config::CliOverrides::default(),
//!     &config::HostEnvironment::capture(),
//! )?;
//! let repo = settings.repository.open()?;
//! engine::run_check(&project, &settings.check, &repo, &Interrupt::new(), &mut reporter)?;
//! ```
//!
//! ## Modules
//!
//! - [`types`]: `CompatibilityCheckConfig` and defaults
//! - [`config`]: `.apicompat.toml` loading and merging
//! - [`project`]: project facts read from `pom.xml`
//! - [`gate`], [`resolve`], [`args`], [`process`], [`outcome`]: the pipeline steps
//! - [`script`]: the bundled launcher
//! - [`engine`]: the steps chained, with progress reporting
//! - [`error`]: `CheckError`

/// Command-line assembly and annotation list files.
pub mod args;

/// Configuration file (`.apicompat.toml`) loading and merging.
pub mod config;

/// Runs the pipeline end to end.
pub mod engine;

/// `CheckError`.
pub mod error;

/// Run/skip decision for the current project.
pub mod gate;

/// Build outcome from the tool's exit status.
pub mod outcome;

/// Subprocess staging, launch and supervision.
pub mod process;

/// Project facts read from `pom.xml`.
pub mod project;

/// Previous version and artifact lookup.
pub mod resolve;

/// The bundled analysis script.
pub mod script;

/// `CompatibilityCheckConfig` and its defaults.
pub mod types;

pub use error::CheckError;

#[cfg(test)]
mod property_tests;
