//! Translates a [`CompatibilityCheckConfig`] into the analysis tool's command line.
//!
//! Token order is fixed. Boolean options add one bare flag when enabled and
//! nothing otherwise. Valued options add a flag and a value only when set.
//! The previous and new artifact paths always come last, in that order.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::CheckError;
use crate::types::{CompatibilityCheckConfig, non_blank};

pub const ANNOTATIONS_LIST_FILE: &str = "japicc-annotations-list";
pub const SKIP_ANNOTATIONS_LIST_FILE: &str = "japicc-skip-annotations-list";

/// Types carrying this annotation are always excluded from the analysis.
pub const SKIP_COMPLIANCE_ANNOTATION: &str =
    "io.github.efenglu.japicc.annotations.SkipComplianceCheck";

/// Arguments passed to the analysis script, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentList(Vec<String>);

impl ArgumentList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `interpreter script args...`
    pub fn command_line(&self, interpreter: &Path, script: &Path) -> Vec<OsString> {
        let mut line = Vec::with_capacity(self.0.len() + 2);
        line.push(interpreter.as_os_str().to_owned());
        line.push(script.as_os_str().to_owned());
        line.extend(self.0.iter().map(OsString::from));
        line
    }

    fn flag(&mut self, name: &str, enabled: bool) {
        if enabled {
            self.0.push(name.to_string());
        }
    }

    fn value(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = non_blank(value) {
            self.0.push(name.to_string());
            self.0.push(value.to_string());
        }
    }

    fn path(&mut self, name: &str, path: Option<&Path>) -> Result<(), CheckError> {
        if let Some(path) = path {
            self.0.push(name.to_string());
            self.0.push(absolute(path)?);
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ArgumentList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build the argument list for one run.
///
/// Writes the annotation list files into `config.output_dir` as a side
/// effect; the directory must already exist.
pub fn build_arguments(
    config: &CompatibilityCheckConfig,
    previous_artifact: &Path,
    new_artifact: &Path,
) -> Result<ArgumentList, CheckError> {
    let mut args = ArgumentList::default();

    args.value("-jdk-path", config.jdk_path.as_deref());
    args.value("-title", config.title.as_deref());
    args.flag("-keep-internal", config.keep_internal);
    args.value(
        "-skip-internal-packages",
        config.skip_internal_packages.as_deref(),
    );
    args.value("-skip-internal-types", config.skip_internal_types.as_deref());
    args.path("-classes-list", config.classes_list.as_deref())?;

    let annotations = write_list_file(
        &config.output_dir,
        ANNOTATIONS_LIST_FILE,
        config.annotations_list.iter().map(String::as_str),
    )?;
    args.path("-annotations-list", annotations.as_deref())?;

    let skip_annotations = write_list_file(
        &config.output_dir,
        SKIP_ANNOTATIONS_LIST_FILE,
        std::iter::once(SKIP_COMPLIANCE_ANNOTATION)
            .chain(config.skip_annotations_list.iter().map(String::as_str)),
    )?;
    args.path("-skip-annotations-list", skip_annotations.as_deref())?;

    args.flag("-skip-deprecated", config.skip_deprecated);
    args.path("-skip-classes", config.skip_classes.as_deref())?;
    args.path("-skip-packages", config.skip_packages.as_deref())?;
    args.path("-report-path", config.report_path.as_deref())?;
    args.path("-bin-report-path", config.bin_report_path.as_deref())?;
    args.path("-src-report-path", config.src_report_path.as_deref())?;
    args.flag("-quick", config.quick);
    args.flag("-sort", config.sort);
    args.flag("-show-access", config.show_access);
    args.flag("-hide-templates", config.hide_templates);
    args.flag("-show-packages", config.show_packages);
    if config.limit_affected > 0 {
        args.value("-limit-affected", Some(config.limit_affected.to_string().as_str()));
    }
    args.flag("-compact", config.compact);
    args.flag("-added-annotations", config.added_annotations);
    args.flag("-removed-annotations", config.removed_annotations);

    args.0.push(absolute(previous_artifact)?);
    args.0.push(absolute(new_artifact)?);

    Ok(args)
}

/// Write de-duplicated, sorted, non-blank entries one per line.
///
/// Returns `None` without touching the disk when there are no entries.
fn write_list_file<'a>(
    dir: &Path,
    name: &str,
    entries: impl Iterator<Item = &'a str>,
) -> Result<Option<PathBuf>, CheckError> {
    let entries: BTreeSet<&str> = entries
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    if entries.is_empty() {
        return Ok(None);
    }

    let mut content = String::new();
    for entry in entries {
        content.push_str(entry);
        content.push('\n');
    }

    let path = dir.join(name);
    std::fs::write(&path, content)
        .map_err(|e| CheckError::io(format!("failed to write {}", path.display()), e))?;
    Ok(Some(path))
}

fn absolute(path: &Path) -> Result<String, CheckError> {
    let abs = std::path::absolute(path).map_err(|e| {
        CheckError::io(format!("cannot make {} absolute", path.display()), e)
    })?;
    Ok(abs.to_string_lossy().into_owned())
}
