use serde::{Deserialize, Serialize};

/// How a stage invocation ended.
///
/// Only [`StageOutcome::Exited`] carries a real process exit status. Every
/// other variant stands for an invocation that could not produce one and is
/// reported with a negative sentinel exit code, which no real process can
/// return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StageOutcome {
    /// The tool ran to completion and reported its own exit status.
    #[default]
    Exited,
    /// The executable was missing or could not be started.
    LaunchFailed,
    /// The tool exceeded its wall-clock budget and was killed.
    TimedOut,
    /// Feeding stdin or draining stdout/stderr failed.
    IoFailed,
    /// The admission gate was closed before the stage could start.
    Rejected,
}

impl StageOutcome {
    pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;
    pub const TIMEOUT_EXIT_CODE: i32 = -2;
    pub const IO_FAILURE_EXIT_CODE: i32 = -3;
    pub const REJECTED_EXIT_CODE: i32 = -4;

    /// Sentinel exit code for outcomes without a real status.
    pub fn sentinel_exit_code(self) -> Option<i32> {
        match self {
            StageOutcome::Exited => None,
            StageOutcome::LaunchFailed => Some(Self::LAUNCH_FAILURE_EXIT_CODE),
            StageOutcome::TimedOut => Some(Self::TIMEOUT_EXIT_CODE),
            StageOutcome::IoFailed => Some(Self::IO_FAILURE_EXIT_CODE),
            StageOutcome::Rejected => Some(Self::REJECTED_EXIT_CODE),
        }
    }

    /// Recover the outcome from a wire exit code.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            Self::LAUNCH_FAILURE_EXIT_CODE => StageOutcome::LaunchFailed,
            Self::TIMEOUT_EXIT_CODE => StageOutcome::TimedOut,
            Self::IO_FAILURE_EXIT_CODE => StageOutcome::IoFailed,
            Self::REJECTED_EXIT_CODE => StageOutcome::Rejected,
            _ => StageOutcome::Exited,
        }
    }
}

/// Result of one stage for one request.
///
/// Every field is always populated: failures that prevent the tool from
/// running still produce a result with a sentinel `exit_code` and a message in
/// `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// Display name of the stage.
    pub label: String,

    /// Exact argument vector that was (or would have been) executed,
    /// program first.
    pub command: Vec<String>,

    /// Process exit status, or a negative sentinel.
    pub exit_code: i32,

    /// Captured output, demangled when requested and eligible.
    pub output: String,
}

impl StageResult {
    /// Result for a tool that ran and reported an exit status.
    pub fn exited(
        label: impl Into<String>,
        command: Vec<String>,
        exit_code: i32,
        output: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            command,
            exit_code,
            output: output.into(),
        }
    }

    /// Result for an invocation that never produced an exit status.
    ///
    /// Passing [`StageOutcome::Exited`] is treated as a launch failure since
    /// there is no status to report.
    pub fn failed(
        label: impl Into<String>,
        command: Vec<String>,
        outcome: StageOutcome,
        message: impl Into<String>,
    ) -> Self {
        let exit_code = outcome
            .sentinel_exit_code()
            .unwrap_or(StageOutcome::LAUNCH_FAILURE_EXIT_CODE);
        Self {
            label: label.into(),
            command,
            exit_code,
            output: message.into(),
        }
    }

    pub fn outcome(&self) -> StageOutcome {
        StageOutcome::from_exit_code(self.exit_code)
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// The command rendered as a single shell-quoted line, for display only.
    pub fn display_command(&self) -> String {
        self.command
            .iter()
            .map(|part| shell_quote(part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(part: &str) -> String {
    let safe = !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | ','));
    if safe {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Vec<String> {
        vec!["swiftc".into(), "main.swift".into(), "-emit-sil".into()]
    }

    #[test]
    fn serializes_wire_field_names() {
        let result = StageResult::exited("SIL Canonical", command(), 0, "sil_stage canonical");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "SIL Canonical");
        assert_eq!(json["exitCode"], 0);
        assert_eq!(json["output"], "sil_stage canonical");
        assert_eq!(json["command"][2], "-emit-sil");
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn failures_use_distinct_negative_sentinels() {
        let outcomes = [
            StageOutcome::LaunchFailed,
            StageOutcome::TimedOut,
            StageOutcome::IoFailed,
            StageOutcome::Rejected,
        ];
        let mut codes = Vec::new();
        for outcome in outcomes {
            let result = StageResult::failed("AST", command(), outcome, "nope");
            assert!(result.exit_code < 0);
            assert_eq!(result.outcome(), outcome);
            assert!(!result.succeeded());
            codes.push(result.exit_code);
        }
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), outcomes.len());
    }

    #[test]
    fn real_exit_codes_are_exited_outcomes() {
        assert_eq!(StageOutcome::from_exit_code(0), StageOutcome::Exited);
        assert_eq!(StageOutcome::from_exit_code(1), StageOutcome::Exited);
        assert_eq!(StageOutcome::from_exit_code(137), StageOutcome::Exited);
    }

    #[test]
    fn display_command_quotes_unsafe_parts() {
        let result = StageResult::exited(
            "IR",
            vec!["/usr/bin/swiftc".into(), "my file.swift".into(), "it's".into()],
            0,
            "",
        );
        assert_eq!(
            result.display_command(),
            r#"/usr/bin/swiftc 'my file.swift' 'it'\''s'"#
        );
    }
}
