use super::args::CompileArgs;
use super::output::write_response;
use crate::error::{CliError, CliResult};
use silscope_config::SilscopeConfig;
use silscope_core::{Component, CompileRequest, CompileResponse, StageKey, log_info, log_warn};
use silscope_runtime::Orchestrator;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

/// Exit status used when the run is interrupted with Ctrl-C.
const INTERRUPTED_EXIT_CODE: u8 = 130;

pub async fn execute(args: CompileArgs, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let source = read_source(args.input.as_deref())?;
    let config = SilscopeConfig::load(config_path)?;
    let orchestrator = Orchestrator::from_config(&config);
    let request = CompileRequest::new(source, args.flags.to_options());

    let start_time = Instant::now();
    let response = tokio::select! {
        response = orchestrator.compile(&request) => response?,
        _ = tokio::signal::ctrl_c() => {
            log_warn!(Component::Cli, "interrupted, stage processes killed");
            return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
        }
    };
    log_info!(
        Component::Cli,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "compilation finished"
    );

    let displayed = select_stages(response, &args.stages);
    write_response(&displayed, args.format)?;

    Ok(if displayed.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_source(input: Option<&Path>) -> CliResult<String> {
    match input {
        None => read_stdin(),
        Some(path) if path == Path::new("-") => read_stdin(),
        Some(path) => {
            if !path.exists() {
                return Err(CliError::InputNotFound {
                    path: path.to_path_buf(),
                });
            }
            Ok(fs::read_to_string(path)?)
        }
    }
}

fn read_stdin() -> CliResult<String> {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source)?;
    Ok(source)
}

/// Keep only the requested stages, in catalog order. An empty filter keeps all.
fn select_stages(response: CompileResponse, keys: &[StageKey]) -> CompileResponse {
    if keys.is_empty() {
        return response;
    }
    let mut selected = CompileResponse::new();
    for (key, result) in response.results {
        if keys.contains(&key) {
            selected.insert(key, result);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use silscope_core::StageResult;
    use std::io::Write;

    fn response() -> CompileResponse {
        let mut response = CompileResponse::new();
        for (code, key) in StageKey::ALL.into_iter().enumerate() {
            response.insert(
                key,
                StageResult::exited(key.as_str(), vec!["swiftc".into()], code as i32, ""),
            );
        }
        response
    }

    #[test]
    fn empty_filter_keeps_every_stage() {
        assert_eq!(select_stages(response(), &[]).len(), StageKey::ALL.len());
    }

    #[test]
    fn filter_keeps_catalog_order() {
        let selected = select_stages(response(), &[StageKey::Assembly, StageKey::SilRaw]);
        let keys: Vec<_> = selected.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![StageKey::SilRaw, StageKey::Assembly]);
        assert!(!selected.all_succeeded());
    }

    #[test]
    fn filter_decides_exit_status() {
        let selected = select_stages(response(), &[StageKey::SilRaw]);
        assert!(selected.all_succeeded());
    }

    #[test]
    fn missing_input_is_reported() {
        let error = read_source(Some(Path::new("/nonexistent/main.swift"))).unwrap_err();
        assert!(matches!(error, CliError::InputNotFound { .. }));
        assert_eq!(error.exit_code(), 66);
    }

    #[test]
    fn reads_source_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "print(1)").unwrap();
        assert_eq!(read_source(Some(file.path())).unwrap(), "print(1)");
    }
}
