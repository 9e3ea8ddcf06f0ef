//! 共享错误类型：配置、传感器载荷、录制文件、sink。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    /// TOML / JSON could not be decoded
    #[error("cannot parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Decoded fine but a value is out of range; `field` is a dotted path
    #[error("invalid configuration value '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// A sensor payload violates its shape (point-cloud stride, NaN timestamp, ...)
    #[error("malformed {stream} payload: {message}")]
    PayloadDecode { stream: String, message: String },

    /// `line` is 1-based
    #[error("recording line {line} is not a sensor event: {message}")]
    RecordingParse { line: usize, message: String },

    #[error("cannot encode {kind} event for recording: {message}")]
    RecordingEncode { kind: String, message: String },

    #[error("sink '{sink_name}' failed to write: {message}")]
    SinkWrite { sink_name: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn payload_decode(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PayloadDecode {
            stream: stream.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
