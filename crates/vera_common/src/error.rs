//! Error taxonomy for the validation engine.
//!
//! Transient failures are retried and then demoted to a failing verdict;
//! structural failures fail immediately and are never retried. No error here
//! ever escapes the engine boundary raw - the runner, executor, and rollback
//! manager all convert them into verdicts or booleans.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VeraError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("structural failure: {0}")]
    Structural(String),

    #[error("unknown check: {0}")]
    UnknownCheck(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("environment initialization failed: {0}")]
    EnvInit(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("suite definition error: {0}")]
    SuiteDefinition(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VeraError {
    /// Only transient failures are worth retrying; everything else is
    /// definitive for the attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, VeraError::Transient(_))
    }
}
