use crate::builder::WorkloadError;
use crate::config::ConfigError;
use crate::wire::JournalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlockshearError {
    #[error(transparent)]
    Workload(#[from] WorkloadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

pub type Result<T> = std::result::Result<T, BlockshearError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_errors_convert_transparently() {
        let err: BlockshearError = ConfigError::ZeroSectorSize.into();
        assert_eq!(err.to_string(), "sector size must be non-zero");
        let err: BlockshearError = WorkloadError::CheckpointPayload { index: 3 }.into();
        assert!(err.to_string().contains("index 3"));
    }
}
