use crate::config::ConfigError;
use crate::oracle::OracleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Whether the failure came from an unavailable or stale price source.
    pub fn is_oracle_unavailable(&self) -> bool {
        matches!(
            self,
            CoreError::Oracle(OracleError::Unavailable(_)) | CoreError::Oracle(OracleError::Stale { .. })
        )
    }
}
