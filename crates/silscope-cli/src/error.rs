//! CLI errors with sysexits-style exit codes.

use std::path::PathBuf;

use silscope_config::ConfigError;
use silscope_runtime::OrchestratorError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source was rejected before any stage ran.
    #[error("{0}")]
    Rejected(String),

    /// No scratch workspace could be prepared.
    #[error("{0}")]
    Workspace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InputNotFound { .. } => 66, // EX_NOINPUT
            CliError::Config(_) => 78,            // EX_CONFIG
            CliError::Rejected(_) => 65,          // EX_DATAERR
            CliError::Workspace(_) => 73,         // EX_CANTCREAT
            CliError::Io(_) => 74,                // EX_IOERR
            CliError::Json(_) => 70,              // EX_SOFTWARE
        }
    }
}

impl From<OrchestratorError> for CliError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::Validation(e) => CliError::Rejected(e.to_string()),
            other => CliError::Workspace(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use silscope_core::ValidationError;

    use super::*;

    #[test]
    fn validation_maps_to_data_error() {
        let error = CliError::from(OrchestratorError::from(ValidationError::EmptySource));
        assert!(matches!(error, CliError::Rejected(_)));
        assert_eq!(error.exit_code(), 65);
        assert_eq!(error.to_string(), "Source is required");
    }

    #[test]
    fn workspace_maps_to_cantcreat() {
        let error = CliError::from(OrchestratorError::Workspace(std::io::Error::other(
            "read-only file system",
        )));
        assert_eq!(error.exit_code(), 73);
    }
}
