//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (validator derive)：噪声 > 0、重力 9.7..=9.9、缓冲容量下限
//! - 初始零偏为有限值
//! - sink 名称非空且唯一
//! - file sink 必须提供 `path` 参数
//! - sink 队列容量 > 0

use std::collections::HashSet;

use contracts::{ContractError, FusionConfig, SinkType};
use validator::Validate;

/// 校验 FusionConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &FusionConfig) -> Result<(), ContractError> {
    validate_field_ranges(config)?;
    validate_initial_biases(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// 字段范围校验（derive 规则）
fn validate_field_ranges(config: &FusionConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|errors| ContractError::config_validation("config", errors.to_string()))
}

/// 校验初始零偏
fn validate_initial_biases(config: &FusionConfig) -> Result<(), ContractError> {
    let biases = [
        ("imu.init_acc_bias", &config.imu.init_acc_bias),
        ("imu.init_gyr_bias", &config.imu.init_gyr_bias),
    ];
    for (field, bias) in biases {
        if !bias.is_finite() {
            return Err(ContractError::config_validation(
                field,
                format!("bias must be finite, got {bias:?}"),
            ));
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(config: &FusionConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "file sink requires a 'path' parameter",
            ));
        }
    }
    Ok(())
}
