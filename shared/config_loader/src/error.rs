use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while locating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The file exists but could not be read.
    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The content is not valid JSON for the requested type.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}
