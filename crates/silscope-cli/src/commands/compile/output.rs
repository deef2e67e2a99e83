use super::args::OutputFormat;
use crate::error::CliResult;
use silscope_core::{CompileResponse, StageOutcome, StageResult};
use std::io::{self, Write};

pub fn write_response(response: &CompileResponse, format: OutputFormat) -> CliResult<()> {
    let rendered = match format {
        OutputFormat::Text => render_text(response),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(response)?;
            json.push('\n');
            json
        }
    };
    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn render_text(response: &CompileResponse) -> String {
    let mut out = String::new();
    for (key, result) in response.iter() {
        out.push_str(&format!(
            "== {} [{}] {}\n",
            result.label,
            key,
            status(result)
        ));
        out.push_str(&format!("$ {}\n", result.display_command()));
        out.push_str(&result.output);
        if !result.output.is_empty() && !result.output.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn status(result: &StageResult) -> String {
    match result.outcome() {
        StageOutcome::Exited => format!("exit {}", result.exit_code),
        StageOutcome::LaunchFailed => "launch failed".to_string(),
        StageOutcome::TimedOut => "timed out".to_string(),
        StageOutcome::IoFailed => "i/o failed".to_string(),
        StageOutcome::Rejected => "rejected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silscope_core::StageKey;

    #[test]
    fn text_sections_carry_label_command_and_output() {
        let mut response = CompileResponse::new();
        response.insert(
            StageKey::Ir,
            StageResult::exited(
                "IR",
                vec!["swiftc".into(), "main.swift".into(), "-emit-ir".into()],
                0,
                "define void @main()",
            ),
        );
        let text = render_text(&response);
        assert_eq!(
            text,
            "== IR [ir] exit 0\n$ swiftc main.swift -emit-ir\ndefine void @main()\n\n"
        );
    }

    #[test]
    fn sentinel_codes_are_named() {
        let result = StageResult::failed("AST", vec![], StageOutcome::TimedOut, "timed out");
        assert_eq!(status(&result), "timed out");
        let result = StageResult::exited("AST", vec![], 1, "error");
        assert_eq!(status(&result), "exit 1");
    }
}
