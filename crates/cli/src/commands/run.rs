//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::FusionConfig;
use ingestion::{BackpressureConfig, DropPolicy};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{InputSource, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let fusion = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        gravity = fusion.imu.gravity,
        imu_buffer = fusion.buffers.imu,
        pairing = ?fusion.sync.pairing,
        frame = ?fusion.publish.frame,
        sinks = fusion.sinks.len(),
        "Configuration loaded"
    );

    let pipeline_config = pipeline_config(args, fusion)?;

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames_published = stats.frames_published,
        scans_consumed = stats.sync.scans_consumed,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("LINS Fusion finished");
    Ok(())
}

/// Translate `run` flags; zero means "no limit" for frames and timeout
fn pipeline_config(args: &RunArgs, fusion: FusionConfig) -> Result<PipelineConfig> {
    let input = match (&args.replay, args.simulate) {
        (Some(path), _) => InputSource::Replay(path.clone()),
        (None, Some(duration_s)) => InputSource::Simulate(duration_s),
        (None, None) => anyhow::bail!("either --replay or --simulate is required"),
    };
    let policy = if args.drop_newest {
        DropPolicy::DropNewest
    } else {
        DropPolicy::Block
    };

    Ok(PipelineConfig {
        fusion,
        input,
        rate: args.rate,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        backpressure: BackpressureConfig::new(args.buffer_size.max(1), policy),
    })
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
