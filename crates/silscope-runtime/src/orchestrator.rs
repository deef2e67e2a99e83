//! Compilation-stage orchestrator.
//!
//! A request moves through
//! `Validating → Preparing → Dispatching → Aggregating → Completed`; the only
//! other terminal state is a validation (or workspace preparation) failure
//! before any stage runs. Once a workspace exists the request always
//! completes with one [`StageResult`] per catalog stage.
//!
//! All stage invocations of a request are driven by the request's own future.
//! Dropping that future (client disconnect, caller timeout) drops every
//! running invocation, which kills its process group, and then the scratch
//! workspace, which removes its directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use silscope_config::{SilscopeConfig, resolve_executable};
use silscope_core::{
    CompileRequest, CompileResponse, Component, StageCatalog, StageOutcome, StageResult, StageSpec,
    Toolchain, log_debug, log_info, log_warn,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::demangle::Demangler;
use crate::error::{GateError, OrchestratorError};
use crate::gate::{AdmissionGate, AdmissionGateHandle};
use crate::runner::{Invocation, ProcessRunner, TokioProcessRunner};
use crate::workspace::ScratchWorkspace;

/// Per-request limits and placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Wall-clock budget for one compiler invocation.
    pub stage_timeout: Duration,
    /// Parent directory for scratch workspaces; system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
    /// Largest accepted source, in bytes.
    pub max_source_bytes: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(30),
            scratch_root: None,
            max_source_bytes: 256 * 1024,
        }
    }
}

/// Runs every catalog stage for a request and aggregates the results.
///
/// Cheap to share behind an `Arc`; the catalog is read-only and the gate is
/// the only state shared between concurrent requests.
pub struct Orchestrator {
    catalog: Arc<StageCatalog>,
    runner: Arc<dyn ProcessRunner>,
    gate: AdmissionGate,
    demangler: Demangler,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        catalog: StageCatalog,
        runner: Arc<dyn ProcessRunner>,
        gate: AdmissionGate,
        demangler: Demangler,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            runner,
            gate,
            demangler,
            settings,
        }
    }

    /// Build an orchestrator that runs real processes as configured.
    ///
    /// Executable names are resolved against `PATH` here, once, so requests
    /// only ever run pre-approved paths.
    pub fn from_config(config: &SilscopeConfig) -> Self {
        let runner: Arc<dyn ProcessRunner> =
            Arc::new(TokioProcessRunner::new(config.limits.max_output_bytes));
        Self::from_config_with_runner(config, runner)
    }

    /// Like [`Orchestrator::from_config`] with a caller-supplied runner.
    pub fn from_config_with_runner(
        config: &SilscopeConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let toolchain = &config.toolchain;
        let compiler = resolve_executable(&toolchain.compiler);
        let demangler_path = resolve_executable(&toolchain.demangler);
        if !compiler.is_absolute() {
            log_warn!(
                Component::Orchestrator,
                compiler = %compiler.display(),
                "compiler not found on PATH, stages will report launch failures"
            );
        }

        let catalog = StageCatalog::new(Toolchain::new(compiler, toolchain.module_name.clone()));
        let demangler = Demangler::new(
            demangler_path,
            toolchain.demangler_args.clone(),
            config.limits.demangle_timeout(),
            Arc::clone(&runner),
        );
        let settings = OrchestratorSettings {
            stage_timeout: config.limits.stage_timeout(),
            scratch_root: config.workspace.scratch_root.clone(),
            max_source_bytes: config.limits.max_source_bytes,
        };
        Self::new(
            catalog,
            runner,
            AdmissionGate::new(config.limits.max_concurrent_invocations),
            demangler,
            settings,
        )
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Handle to the shared admission gate (for shutdown and introspection).
    pub fn gate(&self) -> AdmissionGateHandle {
        self.gate.handle()
    }

    /// Run every stage over `request.source`.
    ///
    /// Fails only when the request is invalid or no workspace could be
    /// prepared; stage failures are reported inside the response.
    pub async fn compile(
        &self,
        request: &CompileRequest,
    ) -> Result<CompileResponse, OrchestratorError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("compile", %request_id);
        self.compile_inner(request).instrument(span).await
    }

    async fn compile_inner(
        &self,
        request: &CompileRequest,
    ) -> Result<CompileResponse, OrchestratorError> {
        let started = Instant::now();

        // Validating
        if let Err(error) = request.validate(self.settings.max_source_bytes) {
            log_info!(Component::Orchestrator, %error, "request rejected");
            return Err(error.into());
        }

        // Preparing
        let workspace =
            ScratchWorkspace::create(self.settings.scratch_root.as_deref(), &request.source)
                .map_err(|error| {
                    log_warn!(Component::Orchestrator, %error, "scratch workspace setup failed");
                    OrchestratorError::Workspace(error)
                })?;
        log_debug!(
            Component::Orchestrator,
            workspace = %workspace.path().display(),
            options = ?request.options,
            "workspace ready"
        );

        // Dispatching
        let stages = self
            .catalog
            .stages()
            .iter()
            .map(|spec| self.run_stage(spec, request, &workspace));
        let results = join_all(stages).await;

        // Aggregating
        let mut response = CompileResponse::new();
        for (spec, result) in self.catalog.stages().iter().zip(results) {
            response.insert(spec.key, result);
        }

        if let Err(error) = workspace.close() {
            log_warn!(Component::Orchestrator, %error, "scratch workspace cleanup failed");
        }

        log_info!(
            Component::Orchestrator,
            stages = response.len(),
            all_succeeded = response.all_succeeded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        Ok(response)
    }

    /// Run one stage and fold every failure mode into its result.
    async fn run_stage(
        &self,
        spec: &StageSpec,
        request: &CompileRequest,
        workspace: &ScratchWorkspace,
    ) -> StageResult {
        let options = &request.options;
        let toolchain = self.catalog.toolchain();
        let command = spec.command(options, toolchain);

        let permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(GateError::Closed) => {
                log_warn!(Component::Orchestrator, stage = %spec.key, "admission gate closed");
                return StageResult::failed(
                    spec.label,
                    command,
                    StageOutcome::Rejected,
                    GateError::Closed.to_string(),
                );
            }
        };

        let invocation = Invocation::new(
            toolchain.compiler.clone(),
            spec.arguments(options, toolchain),
            self.settings.stage_timeout,
        )
        .in_dir(workspace.path());

        log_debug!(Component::Orchestrator, stage = %spec.key, "stage started");
        let started = Instant::now();
        let outcome = self.runner.run(invocation).await;
        drop(permit);

        let output = match outcome {
            Ok(output) => output,
            Err(error) => {
                log_warn!(Component::Orchestrator, stage = %spec.key, %error, "stage did not run to completion");
                return error.into_stage_result(spec.label, command);
            }
        };
        log_debug!(
            Component::Orchestrator,
            stage = %spec.key,
            exit_code = output.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage finished"
        );

        let text = self
            .demangler
            .post_process(output.combined(), spec.demangle_eligible, options.demangle)
            .await;
        StageResult::exited(spec.label, command, output.exit_code, text)
    }
}
