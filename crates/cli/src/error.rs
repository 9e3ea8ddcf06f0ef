use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("no configuration at {path} (pass --config or set LINS_CONFIG)")]
    ConfigNotFound { path: String },

    /// Bad configuration, unreadable recording or sink contract violation
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),

    #[error("ingestion: {0}")]
    Ingestion(#[from] ingestion::IngestionError),

    #[error("dispatcher: {0}")]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// The run could not be set up or was aborted
    #[error("run aborted: {message}")]
    PipelineExecution { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_contract_error() {
        let err: CliError =
            contracts::ContractError::config_validation("sinks[0].name", "empty").into();
        assert!(matches!(err, CliError::Contract(_)));
        assert!(err.to_string().contains("sinks[0].name"));
    }

    #[test]
    fn test_wraps_ingestion_error() {
        let err: CliError = ingestion::IngestionError::DuplicateSource {
            source_name: "replay".to_string(),
        }
        .into();
        assert!(err.to_string().contains("already registered"));
    }
}
