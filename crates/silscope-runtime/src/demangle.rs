//! Demangling post-processor.
//!
//! Demangling is a best-effort enhancement: when the demangler cannot be
//! launched, times out, exits non-zero or produces nothing, the stage keeps
//! its raw output and the request carries on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use silscope_core::{Component, log_warn};

use crate::runner::{Invocation, ProcessRunner};

pub const DEFAULT_DEMANGLER: &str = "swift-demangle";

/// Filters stage output through the demangler collaborator.
#[derive(Clone)]
pub struct Demangler {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    runner: Arc<dyn ProcessRunner>,
}

impl Demangler {
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        timeout: Duration,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            runner,
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Demangle `raw` when the stage is eligible and demangling was requested;
    /// otherwise return it unchanged.
    pub async fn post_process(&self, raw: String, eligible: bool, requested: bool) -> String {
        if !eligible || !requested || raw.trim().is_empty() {
            return raw;
        }

        let invocation = Invocation::new(&self.program, self.args.clone(), self.timeout)
            .with_stdin(raw.as_bytes());
        match self.runner.run(invocation).await {
            Ok(output) if output.success() && !output.truncated && !output.stdout.is_empty() => {
                output.stdout
            }
            Ok(output) => {
                log_warn!(
                    Component::Demangler,
                    exit_code = output.exit_code,
                    truncated = output.truncated,
                    stderr = %output.stderr.trim(),
                    "demangler produced no usable output, keeping raw text"
                );
                raw
            }
            Err(error) => {
                log_warn!(Component::Demangler, %error, "demangler failed, keeping raw text");
                raw
            }
        }
    }
}
