use contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be opened; the run does not start
    #[error("sink '{name}' could not be opened")]
    SinkCreation {
        name: String,
        #[source]
        source: ContractError,
    },
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, source: ContractError) -> Self {
        Self::SinkCreation {
            name: name.into(),
            source,
        }
    }
}
