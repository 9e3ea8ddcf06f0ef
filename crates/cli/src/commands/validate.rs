//! `lins-fusion validate`: load, range-check and lint a configuration file.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use contracts::{FusionConfig, SinkType};

use crate::cli::ValidateArgs;

#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

impl ValidationResult {
    fn rejected(config_path: String, reason: String) -> Self {
        Self {
            valid: false,
            config_path,
            error: Some(reason),
            warnings: None,
            summary: None,
        }
    }

    fn accepted(config_path: String, config: &FusionConfig) -> Self {
        let warnings = collect_warnings(config);
        Self {
            valid: true,
            config_path,
            error: None,
            warnings: (!warnings.is_empty()).then_some(warnings),
            summary: Some(ConfigSummary::of(config)),
        }
    }
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    gravity: f64,
    imu_buffer: usize,
    pairing: String,
    frame: String,
    sink_count: usize,
}

impl ConfigSummary {
    fn of(config: &FusionConfig) -> Self {
        Self {
            version: format!("{:?}", config.version),
            gravity: config.imu.gravity,
            imu_buffer: config.buffers.imu,
            pairing: format!("{:?}", config.sync.pairing),
            frame: format!("{:?}", config.publish.frame),
            sink_count: config.sinks.len(),
        }
    }
}

/// Exit status is an error when the file does not load
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "validating");
    let result = validate_config(args);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("cannot encode validation report")?
        );
    } else {
        print_report(&result);
    }

    anyhow::ensure!(result.valid, "{} is not a usable configuration", result.config_path);
    Ok(())
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    if !args.config.exists() {
        return ValidationResult::rejected(config_path.clone(), format!("File not found: {config_path}"));
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult::accepted(config_path, &config),
        Err(e) => {
            debug!(error = ?e, "configuration rejected");
            ValidationResult::rejected(config_path, e.to_string())
        }
    }
}

/// Loadable but probably not what the user meant
fn collect_warnings(config: &FusionConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - odometry frames will be dropped".to_string());
    }

    let cloud_sinks: Vec<&str> = config
        .sinks
        .iter()
        .filter(|sink| sink.sink_type == SinkType::File && sink.params.contains_key("ply_dir"))
        .map(|sink| sink.name.as_str())
        .collect();

    if config.publish.attach_features && cloud_sinks.is_empty() {
        warnings.push(
            "publish.attach_features is set but no sink writes feature clouds (file sink 'ply_dir')"
                .to_string(),
        );
    }
    if !config.publish.attach_features {
        for name in cloud_sinks {
            warnings.push(format!(
                "Sink '{}' sets 'ply_dir' but publish.attach_features is false - no clouds will be written",
                name
            ));
        }
    }

    if config.buffers.imu < 50 {
        warnings.push(format!(
            "buffers.imu = {} may not cover one scan period at typical IMU rates",
            config.buffers.imu
        ));
    }

    warnings
}

fn print_report(result: &ValidationResult) {
    if !result.valid {
        println!("✗ {} is invalid", result.config_path);
        if let Some(error) = &result.error {
            println!("    {error}");
        }
        return;
    }

    println!("✓ {} is valid", result.config_path);
    if let Some(s) = &result.summary {
        println!();
        println!("    version     {}", s.version);
        println!("    gravity     {} m/s²", s.gravity);
        println!("    imu buffer  {}", s.imu_buffer);
        println!("    pairing     {}", s.pairing);
        println!("    frame       {}", s.frame);
        println!("    sinks       {}", s.sink_count);
    }
    for (i, warning) in result.warnings.iter().flatten().enumerate() {
        if i == 0 {
            println!("\n⚠ warnings");
        }
        println!("    - {warning}");
    }
}
