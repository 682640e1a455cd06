//! The analysis script bundled into the binary.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::CheckError;

pub const SCRIPT_FILE_NAME: &str = "japi-compliance-checker.pl";

pub const EMBEDDED_SCRIPT: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/japi-compliance-checker.pl"
));

/// Make sure the bundled script exists at `<output_dir>/japi-compliance-checker.pl`.
///
/// An existing file is reused as-is, even if it differs from the bundled
/// script; clean the output directory to pick up a new version. Concurrent
/// callers may race: each writes the same bytes to a private temp file and
/// renames it into place, so readers never see a partial script.
pub fn ensure_script_present(output_dir: &Path) -> Result<PathBuf, CheckError> {
    let target = output_dir.join(SCRIPT_FILE_NAME);
    if target.exists() {
        return Ok(target);
    }

    let mut tmp = NamedTempFile::new_in(output_dir).map_err(|e| {
        CheckError::io(
            format!("failed to create temp file in {}", output_dir.display()),
            e,
        )
    })?;
    tmp.write_all(EMBEDDED_SCRIPT)
        .and_then(|()| tmp.flush())
        .map_err(|e| CheckError::io("failed to write analysis script", e))?;
    tmp.persist(&target).map_err(|e| {
        CheckError::io(
            format!("failed to install analysis script at {}", target.display()),
            e.error,
        )
    })?;

    Ok(target)
}
