//! CLI commands.

pub mod compile;
pub mod stages;

pub use compile::CompileArgs;
pub use stages::StagesArgs;

use clap::Args;
use silscope_core::CompileOptions;

/// Compiler option flags shared by `compile` and `stages`.
#[derive(Debug, Clone, Default, Args)]
pub struct OptionFlags {
    /// Demangle symbols in SIL, IR and assembly output
    #[arg(long)]
    pub demangle: bool,

    /// Compile with -O (affects SIL Canonical, IR and assembly)
    #[arg(short = 'O', long)]
    pub optimize: bool,

    /// Whole-module optimization; only takes effect together with -O
    #[arg(long = "wmo")]
    pub whole_module_optimization: bool,

    /// Treat the source as a library (no top-level code entry point)
    #[arg(long)]
    pub parse_as_library: bool,
}

impl OptionFlags {
    pub fn to_options(&self) -> CompileOptions {
        CompileOptions::new()
            .with_demangle(self.demangle)
            .with_optimize(self.optimize)
            .with_whole_module_optimization(self.whole_module_optimization)
            .with_parse_as_library(self.parse_as_library)
    }
}
