//! # LINS Fusion CLI
//!
//! `lins-fusion run | validate | info`
//!
//! 日志级别优先级：`RUST_LOG` > `-v/-q` > 配置文件 `[observability].log_level`。

mod cli;
mod commands;
mod error;
mod pipeline;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    observability::init_with_config(observability::ObservabilityConfig {
        log_format: cli.log_format.into(),
        // `run` installs the exporter itself once the config is loaded
        metrics_port: None,
        default_log_level: log_level(&cli),
    })?;
    info!(version = env!("CARGO_PKG_VERSION"), "lins-fusion");

    let outcome = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };
    if let Err(e) = &outcome {
        error!(error = %e, "command failed");
    }
    outcome
}

fn log_level(cli: &Cli) -> String {
    if cli.quiet {
        return "warn".to_string();
    }
    match cli.verbose {
        0 => config_log_level(command_config(&cli.command)).unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn command_config(command: &Commands) -> &Path {
    match command {
        Commands::Run(args) => &args.config,
        Commands::Validate(args) => &args.config,
        Commands::Info(args) => &args.config,
    }
}

/// Level from the config file; a missing or broken file is reported later by the command
fn config_log_level(path: &Path) -> Option<String> {
    config_loader::ConfigLoader::load_from_path(path)
        .ok()
        .map(|config| config.observability.log_level)
}
