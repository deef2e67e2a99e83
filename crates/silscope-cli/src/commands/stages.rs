//! `silscope stages`: show what each stage would run.

use clap::Args;
use silscope_config::{SilscopeConfig, resolve_executable};
use silscope_core::{CompileOptions, StageCatalog, Toolchain};
use std::path::Path;
use std::process::ExitCode;

use super::OptionFlags;
use crate::error::CliResult;

#[derive(Debug, Args)]
pub struct StagesArgs {
    #[command(flatten)]
    pub flags: OptionFlags,
}

pub fn execute(args: StagesArgs, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = SilscopeConfig::load(config_path)?;
    let toolchain = Toolchain::new(
        resolve_executable(&config.toolchain.compiler),
        config.toolchain.module_name.clone(),
    );
    let catalog = StageCatalog::new(toolchain);
    print!("{}", render(&catalog, &args.flags.to_options()));
    Ok(ExitCode::SUCCESS)
}

fn render(catalog: &StageCatalog, options: &CompileOptions) -> String {
    let mut out = String::new();
    for spec in catalog.stages() {
        let mut notes = Vec::new();
        if spec.optimization_affected {
            notes.push("optimizable");
        }
        if spec.demangles(options) {
            notes.push("demangled");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        out.push_str(&format!("{:<14}{}{}\n", spec.key.as_str(), spec.label, notes));
        out.push_str(&format!("  {}\n", catalog.command(spec, options).join(" ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_stage_with_its_command() {
        let catalog = StageCatalog::new(Toolchain::new("swiftc", "SILInspector"));
        let text = render(&catalog, &CompileOptions::new());
        assert_eq!(text.lines().count(), catalog.len() * 2);
        assert!(text.contains("silRaw        SIL Raw\n  swiftc main.swift -emit-silgen\n"));
        assert!(text.contains("  swiftc main.swift -dump-parse\n"));
    }

    #[test]
    fn flags_show_up_in_commands() {
        let catalog = StageCatalog::new(Toolchain::new("swiftc", "SILInspector"));
        let options = CompileOptions::new().with_optimize(true).with_demangle(true);
        let text = render(&catalog, &options);
        assert!(text.contains("ir            IR (optimizable, demangled)\n  swiftc main.swift -emit-ir -O\n"));
        assert!(text.contains("  swiftc main.swift -dump-ast\n"));
    }
}
