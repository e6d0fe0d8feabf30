//! Error types for flowpoll

use thiserror::Error;

/// Main error type for flowpoll operations
#[derive(Error, Debug)]
pub enum Error {
    /// No execution has been recorded for the caller yet
    #[error("Missing executionArn")]
    MissingExecution,

    /// The engine does not know the execution identifier
    #[error("Execution not found: {0}")]
    UnknownExecution(String),

    /// The engine answered with an error payload
    #[error("Engine error ({status} {code}): {message}")]
    EngineApi {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine request timed out: {0}")]
    EngineTimeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unknown execution error
    pub fn unknown_execution(id: impl Into<String>) -> Self {
        Error::UnknownExecution(id.into())
    }

    /// Create an engine API error
    pub fn engine_api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::EngineApi {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an engine unavailable error
    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Error::EngineUnavailable(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether the error came from talking to the engine
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownExecution(_)
                | Error::EngineApi { .. }
                | Error::EngineUnavailable(_)
                | Error::EngineTimeout(_)
        )
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingExecution => "missing_execution",
            Error::UnknownExecution(_) => "unknown_execution",
            Error::EngineApi { .. } => "engine_api",
            Error::EngineUnavailable(_) => "engine_unavailable",
            Error::EngineTimeout(_) => "engine_timeout",
            Error::InvalidInput(_) => "invalid_input",
            Error::Config(_) => "config",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
