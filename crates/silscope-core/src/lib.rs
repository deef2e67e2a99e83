//! silscope core - data model and stage catalog for the compilation inspector.
//!
//! This crate holds everything that is shared between the runtime, the HTTP
//! server and the CLI but does not itself spawn processes:
//!
//! - **`types`**: compile requests, per-stage results and the aggregate response
//! - **`stages`**: the fixed catalog of compilation stages and their argument builders
//! - **`error`**: request-level validation errors
//! - **`logging`**: `tracing` macros tagged with a pipeline component

pub mod error;
pub mod logging;
pub mod stages;
pub mod types;

pub use error::ValidationError;
pub use logging::Component;
pub use stages::{StageCatalog, StageKey, StageSpec, Toolchain};
pub use types::{
    CompileOptions, CompileRequest, CompileResponse, StageOutcome, StageResult,
};
