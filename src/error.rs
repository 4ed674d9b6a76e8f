//! Error types for the Baton assistant

use thiserror::Error;

/// Result type alias for Baton operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Baton assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech recognition error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// OS automation error (app control, messaging, search, file ops)
    #[error("automation error: {0}")]
    Automation(String),

    /// Requested song, app, contact, or path does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
