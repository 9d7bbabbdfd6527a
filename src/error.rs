//! Error types for the IAT engine

use thiserror::Error;

/// Errors that can occur while planning, running, or scoring a test session
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid stimulus catalog: {0}")]
    InvalidCatalog(String),

    #[error("Testing is disabled by the host application")]
    TestingDisabled,

    #[error("Invalid block number: {0} (expected 1-7)")]
    InvalidBlock(u8),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Invalid response log: {0}")]
    InvalidResponseLog(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
