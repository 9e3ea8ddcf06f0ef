//! # Config Loader
//!
//! 读取 `.toml` / `.json` 配置，解析为 [`FusionConfig`] 并做范围与交叉校验。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("lins.toml")).unwrap();
//! println!("gravity: {}", config.imu.gravity);
//! ```

mod parser;
mod validator;

pub use contracts::FusionConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Format follows the file extension
    pub fn load_from_path(path: &Path) -> Result<FusionConfig, ContractError> {
        let format = ConfigFormat::for_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse then validate; the first violated rule is returned
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FusionConfig, ContractError> {
        let config = format.parse(content)?;
        validator::validate(&config)?;
        Ok(config)
    }

    pub fn to_toml(config: &FusionConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("cannot encode as TOML: {e}")))
    }

    pub fn to_json(config: &FusionConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("cannot encode as JSON: {e}")))
    }
}
