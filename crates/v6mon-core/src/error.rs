//! Error types for the monitor
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the monitor
#[derive(Error, Debug)]
pub enum Error {
    /// Fact source errors (interface/gateway discovery)
    #[error("fact source error: {0}")]
    FactSource(String),

    /// State store errors
    #[error("state store error: {0}")]
    StateStore(String),

    /// Mapping allocation errors
    #[error("mapping error: {0}")]
    Mapping(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// External collaborator failure (exporter, NPTv6 manager)
    #[error("refresher error ({collaborator}): {message}")]
    Refresher {
        /// Name of the external collaborator
        collaborator: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a fact source error
    pub fn fact_source(msg: impl Into<String>) -> Self {
        Self::FactSource(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a mapping error
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a refresher error
    pub fn refresher(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Refresher {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
