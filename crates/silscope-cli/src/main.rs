//! silscope CLI - inspect every compilation stage of a Swift source file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod error;
mod logging;

use error::CliError;

/// silscope: dump parse, AST, SIL, IR and assembly for one source file.
#[derive(Debug, Parser)]
#[command(name = "silscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (can be repeated: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every stage over a source file and print the results.
    #[command(visible_alias = "c")]
    Compile(commands::CompileArgs),

    /// List the stage catalog and the command each stage would run.
    Stages(commands::StagesArgs),

    /// Show version information.
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Compile(args) => commands::compile::execute(args, cli.config.as_deref()).await,
        Command::Stages(args) => commands::stages::execute(args, cli.config.as_deref()),
        Command::Version => {
            print_version();
            Ok(ExitCode::SUCCESS)
        }
    };

    result.unwrap_or_else(|e: CliError| {
        eprintln!("error: {e}");
        ExitCode::from(e.exit_code())
    })
}

/// Print version information.
fn print_version() {
    println!("silscope {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Target: {}", std::env::consts::ARCH);
    println!("OS: {}", std::env::consts::OS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use silscope_core::StageKey;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_compile_flags() {
        let cli = Cli::try_parse_from([
            "silscope", "-vv", "compile", "main.swift", "--demangle", "-O", "--wmo",
            "--stage", "ir", "--stage", "silRaw", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Compile(args) = cli.command else {
            panic!("expected compile");
        };
        let options = args.flags.to_options();
        assert!(options.demangle && options.optimize);
        assert!(options.effective_whole_module_optimization());
        assert!(!options.parse_as_library);
        assert_eq!(args.stages, vec![StageKey::Ir, StageKey::SilRaw]);
        assert_eq!(args.format, commands::compile::OutputFormat::Json);
    }

    #[test]
    fn rejects_unknown_stage() {
        assert!(Cli::try_parse_from(["silscope", "compile", "--stage", "llvm"]).is_err());
    }
}
