//! Runs the analysis tool.
//!
//! [`ProcessOrchestrator`] stages the directories the tool writes into, puts
//! the analysis script in place and runs it to completion. The wait polls
//! for exit, the optional timeout and the [`Interrupt`] handle; on timeout or
//! interruption the child is killed and reaped before returning. A guard
//! kills the child on every other exit path, so no subprocess outlives
//! [`ProcessOrchestrator::invoke`].
//!
//! Captured output is read on background threads. After a kill, the readers
//! get [`DRAIN_GRACE`] to finish; grandchildren that still hold the pipes are
//! not waited for.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crate::args::ArgumentList;
use crate::error::CheckError;
use crate::script::ensure_script_present;
use crate::types::{CompatibilityCheckConfig, StreamMode};

/// How often the wait loop checks for exit, timeout and interruption.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long captured output is still collected after the child was killed.
pub const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the analysis tool did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `-1` when the process was killed or ended by a signal.
    pub exit_code: i32,
    pub timed_out: bool,
    /// Only populated with [`StreamMode::Capture`].
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Wall-clock time rounded down to whole milliseconds, for display.
    pub fn display_duration(&self) -> humantime::FormattedDuration {
        let millis = u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX);
        humantime::format_duration(Duration::from_millis(millis))
    }
}

pub struct ProcessOrchestrator<'a> {
    config: &'a CompatibilityCheckConfig,
    interrupt: Interrupt,
}

impl<'a> ProcessOrchestrator<'a> {
    pub fn new(config: &'a CompatibilityCheckConfig, interrupt: Interrupt) -> Self {
        Self { config, interrupt }
    }

    /// Create the output directory and the parents of every report path.
    pub fn stage_directories(&self) -> Result<(), CheckError> {
        let report_parents = self.config.report_paths().filter_map(Path::parent);
        for dir in std::iter::once(self.config.output_dir.as_path()).chain(report_parents) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            std::fs::create_dir_all(dir).map_err(|e| {
                CheckError::io(format!("failed to create directory {}", dir.display()), e)
            })?;
        }
        Ok(())
    }

    /// Path of the script to run: the configured one, or the bundled one
    /// extracted into the output directory.
    pub fn prepare_script(&self) -> Result<PathBuf, CheckError> {
        match &self.config.analysis_script {
            Some(script) if script.is_file() => std::path::absolute(script).map_err(|e| {
                CheckError::io(format!("cannot make {} absolute", script.display()), e)
            }),
            Some(script) => Err(CheckError::InvalidEnvironment {
                message: format!("analysis script {} does not exist", script.display()),
            }),
            None => ensure_script_present(&self.config.output_dir),
        }
    }

    /// Run `interpreter script args...` from the output directory and wait for it.
    pub fn invoke(
        &self,
        interpreter: &Path,
        script: &Path,
        args: &ArgumentList,
    ) -> Result<ExecutionResult, CheckError> {
        let start = Instant::now();
        let mut command = Command::new(interpreter);
        command
            .arg(script)
            .args(args.as_slice())
            .current_dir(&self.config.output_dir);

        let capture = self.config.stream_mode == StreamMode::Capture;
        if capture {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        } else {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }

        if self.interrupt.is_raised() {
            return Err(CheckError::Interrupted {
                program: interpreter.display().to_string(),
            });
        }
        let mut child = command.spawn().map_err(|source| CheckError::ProcessStart {
            program: interpreter.display().to_string(),
            source,
        })?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let mut guard = ChildGuard::new(child);

        let deadline = self.config.timeout.map(|t| start + t);
        let (exit_code, timed_out) = loop {
            let polled = guard
                .try_wait()
                .map_err(|e| CheckError::io("failed to poll analysis process", e))?;
            if let Some(status) = polled {
                break (exit_code(status), false);
            }
            if self.interrupt.is_raised() {
                guard.terminate();
                return Err(CheckError::Interrupted {
                    program: interpreter.display().to_string(),
                });
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                guard.terminate();
                break (-1, true);
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let grace = timed_out.then(|| Instant::now() + DRAIN_GRACE);
        let stdout = collect(stdout, grace);
        let mut stderr = collect(stderr, grace);
        if let (Some(err), Some(limit)) = (stderr.as_mut(), self.config.timeout)
            && timed_out
        {
            err.push_str(&format!(
                "\ncommand timed out after {}",
                humantime::format_duration(limit)
            ));
        }

        Ok(ExecutionResult {
            exit_code,
            timed_out,
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Forward everything read from `pipe` in chunks until EOF.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Gather a reader's output until EOF, or until `deadline` if one is given.
fn collect(rx: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Option<String> {
    let rx = rx?;
    let mut out = Vec::new();
    loop {
        let chunk = match deadline {
            None => rx.recv().ok(),
            Some(d) => rx
                .recv_timeout(d.saturating_duration_since(Instant::now()))
                .ok(),
        };
        match chunk {
            Some(chunk) => out.extend_from_slice(&chunk),
            None => break,
        }
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

/// Kills and reaps the child unless it was seen to exit.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    fn terminate(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.reaped = true;
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}
