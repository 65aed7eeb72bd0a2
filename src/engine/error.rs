//! Error definitions for the engine module

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The profile's state tree cannot be used as loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The initial state does not exist in the state tree
    #[error("Initial state does not exist: {0}")]
    UnknownState(String),

    /// The engine task panicked or was cancelled
    #[error("Task error: {0}")]
    TaskError(String),

    #[error("Engine already started: {0}")]
    AlreadyStarted(String),
}
