use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    /// 同名数据源只能注册一次
    #[error("source {source_name} is already registered")]
    DuplicateSource { source_name: String },
}

pub type Result<T> = std::result::Result<T, IngestionError>;
