use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, Level};

use artifact_store::{FsArtifactStore, FsEvaluationStore};
use gemini_backend::{GeminiClient, GeminiConfig};
use uxcrew_core::{LogSettings, PipelineConfig};
use uxcrew_pipeline::Pipeline;
use uxcrewd::{build_router, AppState, DaemonConfig};

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let daemon = DaemonConfig::from_env().context("Invalid uxcrewd configuration")?;
    let logging =
        LogSettings::from_env(daemon.log_json, Level::INFO).context("Invalid log settings")?;
    uxcrew_core::init_tracing(logging);

    let config = PipelineConfig::from_env().context("Invalid uxcrew configuration")?;
    let gemini = GeminiConfig::from_env().context("Gemini backend is not configured")?;
    let backend = GeminiClient::new(gemini).context("Failed to build Gemini client")?;

    let artifacts = FsArtifactStore::new(&config.output_dir)
        .with_context(|| format!("Failed to open output dir {}", config.output_dir.display()))?;
    let evaluations = FsEvaluationStore::new(&config.evaluation_dir).with_context(|| {
        format!(
            "Failed to open evaluation dir {}",
            config.evaluation_dir.display()
        )
    })?;
    let upload_dir = config.upload_dir.clone();
    let pipeline = Pipeline::new(
        Arc::new(backend),
        Arc::new(artifacts),
        Arc::new(evaluations),
        config,
    );

    let bind = daemon.bind;
    let state = AppState::new(pipeline, upload_dir, daemon)
        .context("Failed to create upload directory")?;
    let app = build_router(state);

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("uxcrewd listening on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("server failed")?;

    info!("uxcrewd stopped");
    Ok(())
}
