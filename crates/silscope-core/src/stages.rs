//! Stage catalog.
//!
//! Six fixed stages, each a pure mapping from [`CompileOptions`] to the
//! argument vector handed to the compiler. The catalog is built once at
//! startup and shared read-only by every request.
//!
//! Argument layout for every stage:
//!
//! ```text
//! <input> <emit-flag> [-parse-as-library -module-name <module>] [-O] [-whole-module-optimization]
//! ```
//!
//! `-O` and `-whole-module-optimization` are only added to stages that run
//! optimization passes, and the latter only when `-O` is also present.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::CompileOptions;

/// File name the source is materialized under inside a scratch workspace.
pub const SOURCE_FILE_NAME: &str = "main.swift";

pub const DEFAULT_COMPILER: &str = "swiftc";
pub const DEFAULT_MODULE_NAME: &str = "SILInspector";

const PARSE_AS_LIBRARY_FLAG: &str = "-parse-as-library";
const MODULE_NAME_FLAG: &str = "-module-name";
const OPTIMIZE_FLAG: &str = "-O";
const WHOLE_MODULE_FLAG: &str = "-whole-module-optimization";

/// Stable identity of a stage, used as the response map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageKey {
    #[serde(rename = "silRaw")]
    SilRaw,
    #[serde(rename = "silCanonical")]
    SilCanonical,
    #[serde(rename = "ast")]
    Ast,
    #[serde(rename = "parse")]
    Parse,
    #[serde(rename = "ir")]
    Ir,
    #[serde(rename = "assembly")]
    Assembly,
}

impl StageKey {
    pub const ALL: [StageKey; 6] = [
        StageKey::SilRaw,
        StageKey::SilCanonical,
        StageKey::Ast,
        StageKey::Parse,
        StageKey::Ir,
        StageKey::Assembly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKey::SilRaw => "silRaw",
            StageKey::SilCanonical => "silCanonical",
            StageKey::Ast => "ast",
            StageKey::Parse => "parse",
            StageKey::Ir => "ir",
            StageKey::Assembly => "assembly",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == key)
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed inputs to argument building that come from configuration rather
/// than from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Compiler executable. Resolved once at startup, never per request.
    pub compiler: PathBuf,

    /// Module name passed alongside `-parse-as-library`.
    pub module_name: String,
}

impl Toolchain {
    pub fn new(compiler: impl Into<PathBuf>, module_name: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            module_name: module_name.into(),
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(DEFAULT_COMPILER, DEFAULT_MODULE_NAME)
    }
}

/// Definition of one compilation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub key: StageKey,
    pub label: &'static str,
    /// Compiler flag selecting what this stage dumps.
    pub emit_flag: &'static str,
    /// Whether `-O` (and whole-module optimization) apply to this stage.
    pub optimization_affected: bool,
    /// Whether this stage's output may contain mangled symbols.
    pub demangle_eligible: bool,
}

impl StageSpec {
    /// Compiler arguments for this stage, program excluded.
    pub fn arguments(&self, options: &CompileOptions, toolchain: &Toolchain) -> Vec<String> {
        let mut args = vec![SOURCE_FILE_NAME.to_string(), self.emit_flag.to_string()];
        if options.parse_as_library {
            args.push(PARSE_AS_LIBRARY_FLAG.to_string());
            args.push(MODULE_NAME_FLAG.to_string());
            args.push(toolchain.module_name.clone());
        }
        if self.optimization_affected && options.optimize {
            args.push(OPTIMIZE_FLAG.to_string());
            if options.effective_whole_module_optimization() {
                args.push(WHOLE_MODULE_FLAG.to_string());
            }
        }
        args
    }

    /// Full command vector, compiler path first.
    pub fn command(&self, options: &CompileOptions, toolchain: &Toolchain) -> Vec<String> {
        let mut command = vec![toolchain.compiler.to_string_lossy().into_owned()];
        command.extend(self.arguments(options, toolchain));
        command
    }

    /// Whether this stage's output goes through the demangler for `options`.
    pub fn demangles(&self, options: &CompileOptions) -> bool {
        self.demangle_eligible && options.demangle
    }
}

static STAGES: [StageSpec; 6] = [
    StageSpec {
        key: StageKey::SilRaw,
        label: "SIL Raw",
        emit_flag: "-emit-silgen",
        optimization_affected: false,
        demangle_eligible: true,
    },
    StageSpec {
        key: StageKey::SilCanonical,
        label: "SIL Canonical",
        emit_flag: "-emit-sil",
        optimization_affected: true,
        demangle_eligible: true,
    },
    StageSpec {
        key: StageKey::Ast,
        label: "AST",
        emit_flag: "-dump-ast",
        optimization_affected: false,
        demangle_eligible: false,
    },
    StageSpec {
        key: StageKey::Parse,
        label: "Parse",
        emit_flag: "-dump-parse",
        optimization_affected: false,
        demangle_eligible: false,
    },
    StageSpec {
        key: StageKey::Ir,
        label: "IR",
        emit_flag: "-emit-ir",
        optimization_affected: true,
        demangle_eligible: true,
    },
    StageSpec {
        key: StageKey::Assembly,
        label: "Assembly",
        emit_flag: "-emit-assembly",
        optimization_affected: true,
        demangle_eligible: true,
    },
];

/// The ordered, immutable set of stages plus the toolchain they target.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    toolchain: Toolchain,
    stages: &'static [StageSpec],
}

impl StageCatalog {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            stages: &STAGES,
        }
    }

    /// Stages in display order.
    pub fn stages(&self) -> &[StageSpec] {
        self.stages
    }

    pub fn get(&self, key: StageKey) -> Option<&StageSpec> {
        self.stages.iter().find(|spec| spec.key == key)
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Full command vector for `spec` under `options`.
    pub fn command(&self, spec: &StageSpec, options: &CompileOptions) -> Vec<String> {
        spec.command(options, &self.toolchain)
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::new(Toolchain::default())
    }
}
