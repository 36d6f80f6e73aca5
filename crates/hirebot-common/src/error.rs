use thiserror::Error;

/// Errors raised by a browser backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not ready")]
    NotReady,
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Script evaluation failed: {0}")]
    Script(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Operation not supported by this backend: {0}")]
    NotSupported(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}
