//! TOML / JSON 反序列化。缺省字段由 `FusionConfig` 的 serde 默认值补齐。

use std::path::Path;

use contracts::{ContractError, FusionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 扩展名不区分大小写
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    pub fn for_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!(
                "unsupported config extension '{ext}' for {} (expected .toml or .json)",
                path.display()
            ))
        })
    }

    pub fn parse(self, content: &str) -> Result<FusionConfig, ContractError> {
        let decoded: Result<FusionConfig, Box<dyn std::error::Error + Send + Sync>> = match self {
            Self::Toml => toml::from_str(content).map_err(Into::into),
            Self::Json => serde_json::from_str(content).map_err(Into::into),
        };
        decoded.map_err(|e| ContractError::ConfigParse {
            message: format!("{self:?}: {e}"),
            source: Some(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FrameConventionKind, SideChannelPairing, SinkType};

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let content = r#"
[imu]
misalign_yaw_deg = 90.0
acc_noise = 0.05
gyr_noise = 0.005

[imu.init_acc_bias]
x = 0.01
y = 0.0
z = -0.02

[buffers]
imu = 200

[sync]
pairing = "checked"
max_skew_s = 0.002

[publish]
frame = "xyz"

[[sinks]]
name = "console"
sink_type = "log"
"#;
        let config = ConfigFormat::Toml.parse(content).unwrap();
        assert_eq!(config.imu.misalign_yaw_deg, 90.0);
        assert_eq!(config.imu.acc_noise, 0.05);
        assert_eq!(config.imu.init_acc_bias.z, -0.02);
        assert_eq!(config.imu.gravity, 9.81);
        assert_eq!(config.buffers.imu, 200);
        assert_eq!(config.buffers.scan, 3);
        assert_eq!(config.sync.pairing, SideChannelPairing::Checked);
        assert_eq!(config.publish.frame, FrameConventionKind::Xyz);
        assert_eq!(config.sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn test_json_sink_params() {
        let content = r#"{
            "imu": { "gravity": 9.8 },
            "sinks": [{
                "name": "trajectory",
                "sink_type": "file",
                "params": { "path": "/tmp/traj.txt" }
            }]
        }"#;
        let config = ConfigFormat::Json.parse(content).unwrap();
        assert_eq!(config.imu.gravity, 9.8);
        assert_eq!(config.sinks[0].queue_capacity, 100);
        assert_eq!(config.sinks[0].params["path"], "/tmp/traj.txt");
    }

    #[test]
    fn test_syntax_error_and_unknown_sink_type() {
        for bad in ["invalid toml [[[", "[[sinks]]\nname = \"net\"\nsink_type = \"udp\"\n"] {
            let err = ConfigFormat::Toml.parse(bad).unwrap_err();
            assert!(matches!(err, ContractError::ConfigParse { source: Some(_), .. }));
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
        assert!(ConfigFormat::for_path(Path::new("lins")).is_err());
    }
}
