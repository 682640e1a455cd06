//! Maps the tool's exit status to a build outcome.

use std::path::Path;

use crate::process::ExecutionResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// The tool reported problems but `fail_on_error` is off.
    Warning(String),
    Failure(String),
}

impl BuildOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Classify a finished run. Any exit code other than zero, and any timeout,
/// is a failed analysis; warning and failure carry the same message.
pub fn report_outcome(
    result: &ExecutionResult,
    fail_on_error: bool,
    report_path: Option<&Path>,
) -> BuildOutcome {
    if result.success() {
        return BuildOutcome::Success;
    }

    let mut message = String::from("Validation error, see log for details");
    if let Some(path) = report_path {
        message.push_str(&format!(": file://{}", path.display()));
    }
    if result.timed_out {
        message.push_str(" (analysis timed out)");
    }

    if fail_on_error {
        BuildOutcome::Failure(message)
    } else {
        BuildOutcome::Warning(message)
    }
}
