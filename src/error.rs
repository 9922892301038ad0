//! Custom error types for trenditools

use thiserror::Error;

/// Main error type for trenditools operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Extraction error: {0}")]
    Extract(String),

    #[error("Extraction job timed out after {0} poll attempts")]
    ExtractTimeout(u32),

    #[error("Screenshot capture error: {0}")]
    Capture(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Chat assistant error: {0}")]
    Chat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Not initialized: run 'trendi init' first")]
    NotInitialized,

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Result type alias for trenditools
pub type Result<T> = std::result::Result<T, Error>;
