//! Scripted process runner for tests.
//!
//! Lets tests decide, per invocation, whether a "process" prints canned
//! output, fails to launch, times out or hangs until cancelled, without any
//! real toolchain installed.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use silscope_core::stages::SOURCE_FILE_NAME;

use crate::error::InvocationError;
use crate::runner::{Invocation, ProcessOutput, ProcessRunner};

/// Mangled symbol emitted by [`swift_like`] for demangle-eligible stages.
pub const MANGLED_SYMBOL: &str = "$s4main5helloyyF";
/// What [`swift_like`]'s demangler turns [`MANGLED_SYMBOL`] into.
pub const DEMANGLED_SYMBOL: &str = "main.hello() -> ()";

/// What a scripted invocation does.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Exit with the given output.
    Output(ProcessOutput),
    /// Exit with the given output after a delay.
    Delayed(Duration, ProcessOutput),
    /// Fail as if the executable were missing.
    LaunchFailure,
    /// Fail as if the timeout elapsed.
    Timeout,
    /// Fail as if the output pipes broke.
    IoFailure,
    /// Never finish; only ends when the caller drops the future.
    Hang,
}

type Script = dyn Fn(&Invocation) -> Scripted + Send + Sync;

pub struct ScriptedRunner {
    script: Box<Script>,
    calls: Mutex<Vec<Invocation>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new(script: impl Fn(&Invocation) -> Scripted + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Every invocation seen so far, in call order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    /// Invocations whose program path ends with `name`.
    pub fn calls_to(&self, name: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.program.ends_with(name))
            .collect()
    }

    /// Highest number of invocations that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput, InvocationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        let _active = ActiveGuard::enter(&self.active, &self.peak);

        match (self.script)(&invocation) {
            Scripted::Output(output) => Ok(output),
            Scripted::Delayed(delay, output) => {
                tokio::time::sleep(delay).await;
                Ok(output)
            }
            Scripted::LaunchFailure => Err(InvocationError::Launch {
                program: invocation.program,
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
            Scripted::Timeout => Err(InvocationError::Timeout {
                program: invocation.program,
                timeout: invocation.timeout,
            }),
            Scripted::IoFailure => Err(InvocationError::Io {
                program: invocation.program,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
            }),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

struct ActiveGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActiveGuard<'a> {
    fn enter(active: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::AcqRel) + 1;
        peak.fetch_max(now, Ordering::AcqRel);
        Self { active }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A script that behaves like `swiftc` and `swift-demangle`.
///
/// The "compiler" reads `main.swift` from the invocation's working directory
/// and echoes a dump for the requested emit flag; SIL, IR and assembly dumps
/// mention [`MANGLED_SYMBOL`]. The "demangler" (any program whose name
/// contains `demangle`) rewrites that symbol on stdin.
pub fn swift_like(invocation: &Invocation) -> Scripted {
    let program = invocation.program.to_string_lossy();
    if program.contains("demangle") {
        let input = invocation
            .stdin
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        return Scripted::Output(ProcessOutput::new(
            0,
            input.replace(MANGLED_SYMBOL, DEMANGLED_SYMBOL),
            "",
        ));
    }

    let source = invocation
        .working_dir
        .as_ref()
        .and_then(|dir| std::fs::read_to_string(dir.join(SOURCE_FILE_NAME)).ok());
    let Some(source) = source else {
        return Scripted::Output(ProcessOutput::new(
            1,
            "",
            format!("<unknown>:0: error: no such file or directory: '{SOURCE_FILE_NAME}'"),
        ));
    };
    if source.contains("#error") {
        return Scripted::Output(ProcessOutput::new(
            1,
            "",
            "main.swift:1:1: error: #error directive",
        ));
    }

    let flags = invocation.args.join(" ");
    let emit = invocation.args.get(1).map(String::as_str).unwrap_or_default();
    let body = match emit {
        "-dump-parse" => format!("(source_file \"main.swift\"\n  (top_level_code_decl {source}))"),
        "-dump-ast" => format!(
            "(source_file \"main.swift\"\n  (top_level_code_decl range=[main.swift:1:1]\n    (call_expr type=\"()\" {source})))"
        ),
        "-emit-silgen" => format!("sil_stage raw\n// {MANGLED_SYMBOL}\nsil @{MANGLED_SYMBOL} // {flags}"),
        "-emit-sil" => format!("sil_stage canonical\nsil @{MANGLED_SYMBOL} // {flags}"),
        "-emit-ir" => format!("define swiftcc void @\"{MANGLED_SYMBOL}\"() ; {flags}"),
        "-emit-assembly" => format!("\t.globl\t_{MANGLED_SYMBOL}\n_{MANGLED_SYMBOL}:\n\tret ; {flags}"),
        other => {
            return Scripted::Output(ProcessOutput::new(
                1,
                "",
                format!("error: unknown argument: '{other}'"),
            ));
        }
    };
    Scripted::Output(ProcessOutput::new(0, body, ""))
}

/// Process ids written one per line to `path`. Missing file reads as none.
#[cfg(target_os = "linux")]
pub fn read_pids(path: &std::path::Path) -> Vec<u32> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// Whether `pid` exists and is not a zombie awaiting its reaper.
#[cfg(target_os = "linux")]
pub fn process_is_running(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // The state letter follows the parenthesised command name.
    stat.rsplit_once(')')
        .map(|(_, rest)| !rest.trim_start().starts_with(|c| c == 'Z' || c == 'X'))
        .unwrap_or(false)
}

/// Poll until `pid` stops running; false if it outlives `within`.
#[cfg(target_os = "linux")]
pub async fn wait_for_exit(pid: u32, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while process_is_running(pid) {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}
