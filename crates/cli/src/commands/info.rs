//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::FusionConfig;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    imu: ImuInfo,
    buffers: BufferInfo,
    sync: SyncInfo,
    publish: PublishInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct ImuInfo {
    gravity: f64,
    misalignment_deg: [f64; 3],
    acc_noise: f64,
    gyr_noise: f64,
    acc_walk: f64,
    gyr_walk: f64,
}

#[derive(Serialize)]
struct BufferInfo {
    imu: usize,
    scan: usize,
    scan_info: usize,
    outlier: usize,
}

#[derive(Serialize)]
struct SyncInfo {
    pairing: String,
    max_skew_s: f64,
}

#[derive(Serialize)]
struct PublishInfo {
    frame: String,
    attach_features: bool,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &FusionConfig, args: &InfoArgs) -> ConfigInfo {
    let imu = &config.imu;

    ConfigInfo {
        version: format!("{:?}", config.version),
        imu: ImuInfo {
            gravity: imu.gravity,
            misalignment_deg: [
                imu.misalign_roll_deg,
                imu.misalign_pitch_deg,
                imu.misalign_yaw_deg,
            ],
            acc_noise: imu.acc_noise,
            gyr_noise: imu.gyr_noise,
            acc_walk: imu.acc_walk,
            gyr_walk: imu.gyr_walk,
        },
        buffers: BufferInfo {
            imu: config.buffers.imu,
            scan: config.buffers.scan,
            scan_info: config.buffers.scan_info,
            outlier: config.buffers.outlier,
        },
        sync: SyncInfo {
            pairing: format!("{:?}", config.sync.pairing),
            max_skew_s: config.sync.max_skew_s,
        },
        publish: PublishInfo {
            frame: format!("{:?}", config.publish.frame),
            attach_features: config.publish.attach_features,
        },
        sinks: config
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: if args.sinks {
                    s.params.clone()
                } else {
                    HashMap::new()
                },
            })
            .collect(),
        metrics_port: config.observability.metrics_port,
    }
}

fn print_config_info(config: &FusionConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 LINS Fusion Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let imu = &config.imu;
    println!("🧭 IMU");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Gravity: {} m/s²", imu.gravity);
    println!(
        "   ├─ Misalignment (deg): roll={} pitch={} yaw={}",
        imu.misalign_roll_deg, imu.misalign_pitch_deg, imu.misalign_yaw_deg
    );
    println!(
        "   ├─ Initial bias: acc=({}, {}, {}) gyr=({}, {}, {})",
        imu.init_acc_bias.x,
        imu.init_acc_bias.y,
        imu.init_acc_bias.z,
        imu.init_gyr_bias.x,
        imu.init_gyr_bias.y,
        imu.init_gyr_bias.z
    );
    println!("   ├─ Noise: acc={} gyr={}", imu.acc_noise, imu.gyr_noise);
    println!("   └─ Random walk: acc={} gyr={}", imu.acc_walk, imu.gyr_walk);

    let buffers = &config.buffers;
    println!("\n🗃  Buffers");
    println!(
        "   └─ imu={} scan={} scan_info={} outlier={}",
        buffers.imu, buffers.scan, buffers.scan_info, buffers.outlier
    );

    println!("\n⚙️  Sync Settings");
    println!("   ├─ Pairing: {:?}", config.sync.pairing);
    println!("   └─ Max skew: {} s", config.sync.max_skew_s);

    println!("\n🛰  Publish");
    println!("   ├─ Frame: {:?}", config.publish.frame);
    println!("   └─ Attach features: {}", config.publish.attach_features);

    if !config.sinks.is_empty() {
        println!("\n📤 Sinks ({})", config.sinks.len());
        for (i, sink) in config.sinks.iter().enumerate() {
            let is_last = i == config.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
            if args.sinks {
                let mut params: Vec<_> = sink.params.iter().collect();
                params.sort();
                for (key, value) in params {
                    println!("   {}  {} = {}", child_prefix, key, value);
                }
            }
        }
    }

    if let Some(port) = config.observability.metrics_port {
        println!("\n📈 Metrics endpoint: 0.0.0.0:{}", port);
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};

    #[test]
    fn test_sink_params_only_with_flag() {
        let mut config = FusionConfig::default();
        config.sinks.push(SinkConfig {
            name: "trajectory".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 10,
            params: HashMap::from([("path".to_string(), "traj.txt".to_string())]),
        });

        let mut args = InfoArgs {
            config: "fusion.toml".into(),
            json: true,
            sinks: false,
        };
        let info = build_config_info(&config, &args);
        assert!(info.sinks[0].params.is_empty());

        args.sinks = true;
        let info = build_config_info(&config, &args);
        assert_eq!(info.sinks[0].params["path"], "traj.txt");
        assert_eq!(info.buffers.imu, 500);
        assert_eq!(info.publish.frame, "Yzx");
    }
}
