//! Error types for the deploy agent

use thiserror::Error;

/// Main error type for the deploy agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Clone error: {0}")]
    CloneError(String),

    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Pull error: {0}")]
    PullError(String),

    #[error("Command error: {0}")]
    CommandError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl AgentError {
    /// Whether the error aborted a repository synchronization
    pub fn is_sync_error(&self) -> bool {
        matches!(
            self,
            AgentError::CloneError(_) | AgentError::FetchError(_) | AgentError::PullError(_)
        )
    }
}
