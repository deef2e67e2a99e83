//! External process execution.
//!
//! [`TokioProcessRunner`] spawns exactly one process per call with a fixed
//! argument vector (never through a shell), optionally feeds it stdin,
//! captures stdout and stderr, and enforces a wall-clock timeout. On unix the
//! child leads its own process group so a timeout or a cancelled caller
//! takes down every descendant with it.
//!
//! Each stream is read through a bounded buffer. A process that writes past
//! the capture cap has its group killed, so runaway output never grows the
//! host's memory beyond the cap.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use silscope_core::{Component, log_debug, log_warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::InvocationError;

/// Marker appended to output that hit the capture cap.
pub const TRUNCATION_MARKER: &str = "[output truncated]";

/// One external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Pre-approved executable path. Never derived from request content.
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Bytes written to the child's stdin, which is closed afterwards.
    /// When `None` stdin is attached to the null device.
    pub stdin: Option<Vec<u8>>,
    /// Working directory; also exported as `TMPDIR` so tool intermediates
    /// land in the same place.
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            stdin: None,
            working_dir: None,
            timeout,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program followed by its arguments.
    pub fn command_line(&self) -> Vec<String> {
        let mut line = vec![self.program.to_string_lossy().into_owned()];
        line.extend(self.args.iter().cloned());
        line
    }
}

/// Exit status and captured streams of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Whether the streams were cut at the capture cap.
    pub truncated: bool,
}

impl ProcessOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            truncated: false,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, separated by a newline when needed.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        if self.truncated {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Runs one external process per call.
///
/// The orchestrator only talks to this trait, which lets tests inject
/// launch failures, timeouts and canned output.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput, InvocationError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    max_output_bytes: usize,
}

impl TokioProcessRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(1024 * 1024)
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput, InvocationError> {
        let Invocation {
            program,
            args,
            stdin,
            working_dir,
            timeout,
        } = invocation;

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &working_dir {
            command.current_dir(dir).env("TMPDIR", dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| InvocationError::Launch {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();
        let mut group = ProcessGroupGuard::new(pid);
        log_debug!(Component::Runner, program = %program.display(), ?args, "spawned");

        let stdin_pipe = child.stdin.take();
        let feed = async move {
            let (Some(mut pipe), Some(bytes)) = (stdin_pipe, stdin) else {
                return Ok(());
            };
            match pipe.write_all(&bytes).await {
                // The tool may exit without draining its input.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
                other => other?,
            }
            match pipe.shutdown().await {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };
        let limit = self.max_output_bytes;
        let stdout = read_capped(child.stdout.take(), limit, pid);
        let stderr = read_capped(child.stderr.take(), limit, pid);
        let exchange = async move {
            let ((), stdout, stderr, status) =
                tokio::try_join!(feed, stdout, stderr, child.wait())?;
            Ok::<_, io::Error>((status, stdout, stderr))
        };

        let (status, stdout, stderr) = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(InvocationError::Io { program, source });
            }
            Err(_) => {
                group.kill();
                log_warn!(
                    Component::Runner,
                    program = %program.display(),
                    timeout_ms = timeout.as_millis() as u64,
                    "process timed out and was killed"
                );
                return Err(InvocationError::Timeout { program, timeout });
            }
        };
        group.disarm();

        let exit_code = exit_code_of(status);
        log_debug!(
            Component::Runner,
            program = %program.display(),
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "process exited"
        );
        Ok(capture(exit_code, &stdout, &stderr, limit))
    }
}

/// Read at most `limit + 1` bytes from `pipe`.
///
/// The extra byte marks overflow for [`capture`]. On overflow the pipe is
/// closed and the process group `pid` is killed.
async fn read_capped<R>(pipe: Option<R>, limit: usize, pid: Option<u32>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(Vec::new());
    };
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    pipe.take(cap).read_to_end(&mut bytes).await?;
    if bytes.len() > limit {
        log_warn!(Component::Runner, limit, "output cap reached, stopping process");
        if let Some(pid) = pid {
            kill_process_group(pid);
        }
    }
    Ok(bytes)
}

/// Decode both streams and cut them to a shared byte budget.
fn capture(exit_code: i32, stdout: &[u8], stderr: &[u8], limit: usize) -> ProcessOutput {
    let mut stdout = String::from_utf8_lossy(stdout).into_owned();
    let mut stderr = String::from_utf8_lossy(stderr).into_owned();
    let mut truncated = false;

    if stdout.len() > limit {
        truncate_at_char_boundary(&mut stdout, limit);
        truncated = true;
    }
    let remaining = limit - stdout.len();
    if stderr.len() > remaining {
        truncate_at_char_boundary(&mut stderr, remaining);
        truncated = true;
    }

    ProcessOutput {
        exit_code,
        stdout,
        stderr,
        truncated,
    }
}

fn truncate_at_char_boundary(text: &mut String, limit: usize) {
    let mut cut = limit.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Kills the child's whole process group unless disarmed.
///
/// Armed from spawn until the child is reaped, so timeouts and dropped
/// (cancelled) runs both take every descendant down.
struct ProcessGroupGuard {
    pid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn kill(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_process_group(pid);
        }
    }

    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// SIGKILL the process group led by `pid`. No-op off unix, where the child
/// is still killed on drop.
fn kill_process_group(pid: u32) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = i32::try_from(pid) {
            // SAFETY: signalling a process group we created; a stale group
            // id only yields ESRCH.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}
