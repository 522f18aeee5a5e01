//! Game view error types

use thiserror::Error;

/// Errors raised by game window implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameViewError {
    /// The view was used after it was disposed
    #[error("Game view has been disposed")]
    Disposed,

    /// The operation needs a graphics context that doesn't exist, or tried to
    /// change write-once configuration while one does
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A required setting is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The native platform refused an allocation or request
    #[error("Platform error: {0}")]
    Platform(String),

    /// The property or event has no native equivalent on this platform
    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),
}

impl GameViewError {
    /// Shorthand for [`GameViewError::InvalidState`]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        GameViewError::InvalidState(message.into())
    }

    /// Shorthand for [`GameViewError::Configuration`]
    pub fn configuration(message: impl Into<String>) -> Self {
        GameViewError::Configuration(message.into())
    }

    /// Shorthand for [`GameViewError::Platform`]
    pub fn platform(message: impl Into<String>) -> Self {
        GameViewError::Platform(message.into())
    }
}

/// Result type for game view operations
pub type Result<T> = std::result::Result<T, GameViewError>;
