use serde::{Deserialize, Serialize};

/// User-toggleable flags shared by every stage of one request.
///
/// The flags are plain data; how each one affects a given stage is decided by
/// [`crate::StageSpec::arguments`], never by ambient state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Feed eligible stage output through the demangler.
    pub demangle: bool,

    /// Enable optimization for stages that run optimization passes.
    pub optimize: bool,

    /// Whole-module optimization. Only takes effect together with `optimize`.
    ///
    /// `moduleOptimize` is accepted as an alternative name. A body carrying
    /// both names is rejected as a duplicate field.
    #[serde(alias = "moduleOptimize")]
    pub whole_module_optimization: bool,

    /// Treat the source as a library (no implicit top-level entry point).
    pub parse_as_library: bool,
}

impl CompileOptions {
    /// Options with every flag off.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demangle(mut self, demangle: bool) -> Self {
        self.demangle = demangle;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_whole_module_optimization(mut self, enabled: bool) -> Self {
        self.whole_module_optimization = enabled;
        self
    }

    pub fn with_parse_as_library(mut self, enabled: bool) -> Self {
        self.parse_as_library = enabled;
        self
    }

    /// Whether whole-module optimization actually applies.
    ///
    /// Requesting it without `optimize` is accepted and ignored.
    pub fn effective_whole_module_optimization(&self) -> bool {
        self.optimize && self.whole_module_optimization
    }
}
