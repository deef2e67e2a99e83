//! silscope runtime - runs the compilation stages for one request.
//!
//! - **`runner`**: spawns one external process with a timeout and captures its output
//! - **`gate`**: process-wide admission gate bounding concurrent compiler processes
//! - **`workspace`**: request-scoped scratch directory holding the source file
//! - **`demangle`**: best-effort demangling of eligible stage output
//! - **`orchestrator`**: fans a request out over the stage catalog and aggregates results
//!
//! ```text
//!  CompileRequest ──► Orchestrator ──► ScratchWorkspace (main.swift)
//!                          │
//!            ┌─────────────┼─────────────┐
//!            ▼             ▼             ▼
//!       AdmissionGate  AdmissionGate  ...   (one permit per compiler process)
//!            │             │
//!       ProcessRunner ProcessRunner
//!            │             │
//!        Demangler     Demangler
//!            └──────┬──────┘
//!                   ▼
//!            CompileResponse
//! ```

pub mod demangle;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod runner;
pub mod workspace;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use demangle::Demangler;
pub use error::{GateError, InvocationError, OrchestratorError};
pub use gate::{AdmissionGate, AdmissionGateHandle, AdmissionPermit};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use runner::{Invocation, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use workspace::ScratchWorkspace;
