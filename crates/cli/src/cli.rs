//! Command-line surface of `lins-fusion`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// LINS Fusion - lidar-inertial state estimation pipeline
#[derive(Parser, Debug)]
#[command(
    name = "lins-fusion",
    author,
    version,
    about = "Lidar-inertial odometry pipeline",
    long_about = "Fuses a high-rate IMU stream with lidar scans into a pose estimate.\n\n\
                  Reads sensor events from a recording or a synthetic scenario, \n\
                  synchronizes them scan by scan, and publishes odometry to the \n\
                  configured sinks."
)]
pub struct Cli {
    /// More log output: -v debug, -vv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LINS_VERBOSE")]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// How log lines are rendered
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LINS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate a trajectory from a recording or a synthetic scenario
    Run(RunArgs),

    /// Check a configuration file and report warnings
    Validate(ValidateArgs),

    /// Print the effective configuration
    Info(InfoArgs),
}

#[derive(Parser, Debug, Clone)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .args(["replay", "simulate"])
))]
pub struct RunArgs {
    /// Fusion configuration (.toml or .json)
    #[arg(short, long, default_value = "config.toml", env = "LINS_CONFIG")]
    pub config: PathBuf,

    /// Replay a JSON Lines recording
    #[arg(long, value_name = "JSONL")]
    pub replay: Option<PathBuf>,

    /// Run a synthetic stationary scenario of the given length (seconds)
    #[arg(long, value_name = "SECS")]
    pub simulate: Option<f64>,

    /// Playback rate relative to sensor time (0 = as fast as possible)
    #[arg(long, default_value = "0", env = "LINS_RATE")]
    pub rate: f64,

    /// Stop after publishing this many poses (0 = never)
    #[arg(long, default_value = "0", env = "LINS_MAX_FRAMES")]
    pub max_frames: u64,

    /// Stop after this many wall-clock seconds (0 = never)
    #[arg(long, default_value = "0", env = "LINS_TIMEOUT")]
    pub timeout: u64,

    /// Capacity of the sensor event channel
    #[arg(long, default_value = "1024", env = "LINS_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Drop new events instead of blocking sources when the channel is full
    #[arg(long)]
    pub drop_newest: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Fusion configuration to check
    #[arg(short, long, default_value = "config.toml", env = "LINS_CONFIG")]
    pub config: PathBuf,

    /// Machine-readable report
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Fusion configuration to show
    #[arg(short, long, default_value = "config.toml", env = "LINS_CONFIG")]
    pub config: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,

    /// Include per-sink params
    #[arg(long)]
    pub sinks: bool,
}

/// Rendering of log lines
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line, colored
    #[default]
    Pretty,
    /// Single line without targets
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
