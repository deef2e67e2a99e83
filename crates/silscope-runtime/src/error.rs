//! Runtime errors.
//!
//! [`InvocationError`] describes why a single external process produced no
//! exit status. It never escapes the orchestrator: every variant is folded
//! into a [`StageResult`] with a sentinel exit code. [`OrchestratorError`] is
//! the only error a caller of `compile` can observe.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use silscope_core::{StageOutcome, StageResult, ValidationError};
use thiserror::Error;

/// Failure to obtain an exit status from an external process.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The process exceeded its wall-clock budget and was killed.
    #[error("'{program}' timed out after {}s and was terminated", timeout.as_secs_f64())]
    Timeout {
        program: PathBuf,
        timeout: Duration,
    },

    /// The executable is missing or could not be started.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing stdin or reading stdout/stderr failed.
    #[error("I/O failure while running '{program}': {source}")]
    Io {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InvocationError {
    pub fn outcome(&self) -> StageOutcome {
        match self {
            InvocationError::Timeout { .. } => StageOutcome::TimedOut,
            InvocationError::Launch { .. } => StageOutcome::LaunchFailed,
            InvocationError::Io { .. } => StageOutcome::IoFailed,
        }
    }

    /// Fold this failure into a stage result.
    pub fn into_stage_result(self, label: &str, command: Vec<String>) -> StageResult {
        StageResult::failed(label, command, self.outcome(), self.to_string())
    }
}

/// Admission gate errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The gate was closed; no further compiler processes are admitted.
    #[error("admission gate closed, the service is shutting down")]
    Closed,
}

/// Errors that reject a whole compile request.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The scratch workspace could not be prepared, so no stage could run.
    #[error("failed to prepare scratch workspace: {0}")]
    Workspace(#[source] io::Error),
}

impl OrchestratorError {
    /// Whether the caller sent a bad request, as opposed to a host failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, OrchestratorError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_errors_map_to_sentinels() {
        let command = vec!["swiftc".to_string()];
        let timeout = InvocationError::Timeout {
            program: PathBuf::from("swiftc"),
            timeout: Duration::from_secs(30),
        }
        .into_stage_result("IR", command.clone());
        assert_eq!(timeout.exit_code, StageOutcome::TIMEOUT_EXIT_CODE);
        assert!(timeout.output.contains("timed out"));

        let launch = InvocationError::Launch {
            program: PathBuf::from("swiftc"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        }
        .into_stage_result("IR", command);
        assert_eq!(launch.exit_code, StageOutcome::LAUNCH_FAILURE_EXIT_CODE);
        assert!(launch.output.contains("failed to launch 'swiftc'"));
        assert_ne!(timeout.output, launch.output);
    }

    #[test]
    fn only_validation_is_a_client_error() {
        assert!(OrchestratorError::from(ValidationError::EmptySource).is_client_error());
        let workspace = OrchestratorError::Workspace(io::Error::other("disk full"));
        assert!(!workspace.is_client_error());
    }
}
