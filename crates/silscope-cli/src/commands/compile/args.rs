use clap::{Args, ValueEnum};
use silscope_core::StageKey;
use std::path::PathBuf;

use crate::commands::OptionFlags;

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Swift source file to inspect (`-` or omitted reads stdin)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub flags: OptionFlags,

    /// Only display these stages (can be specified multiple times)
    #[arg(long = "stage", value_name = "KEY", value_parser = parse_stage_key)]
    pub stages: Vec<StageKey>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One section per stage with its command and output
    Text,
    /// The `{"results": {...}}` document served over HTTP
    Json,
}

pub(crate) fn parse_stage_key(value: &str) -> Result<StageKey, String> {
    StageKey::parse(value).ok_or_else(|| {
        let known = StageKey::ALL
            .iter()
            .map(|key| key.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown stage '{value}' (expected one of: {known})")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_stage_keys() {
        assert_eq!(parse_stage_key("silRaw"), Ok(StageKey::SilRaw));
        assert_eq!(parse_stage_key("assembly"), Ok(StageKey::Assembly));
    }

    #[test]
    fn unknown_stage_lists_known_keys() {
        let error = parse_stage_key("llvm").unwrap_err();
        assert!(error.contains("llvm"));
        assert!(error.contains("silCanonical"));
    }
}
