use std::path::PathBuf;
use std::sync::Arc;

use silscope_config::SilscopeConfig;
use silscope_runtime::Orchestrator;
use silscope_server::{AppState, router};
use tracing::info;

/// Environment variable naming an explicit config file.
const CONFIG_ENV: &str = "SILSCOPE_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,silscope=info,silscope_server=debug".to_string()),
        )
        .init();

    let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = SilscopeConfig::load(config_path.as_deref())?;
    let addr = config.server.socket_addr()?;

    let orchestrator = Arc::new(Orchestrator::from_config(&config));
    let gate = orchestrator.gate();
    info!(
        compiler = %orchestrator.catalog().toolchain().compiler.display(),
        max_concurrent = config.limits.max_concurrent_invocations,
        stage_timeout_secs = config.limits.stage_timeout_secs,
        "orchestrator ready"
    );

    let app = router(AppState::new(orchestrator));
    info!(%addr, "starting silscope-server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested, closing admission gate");
            }
            gate.close();
        })
        .await?;
    Ok(())
}
