//! RTP error types
//!
//! All fallible operations in this crate return [`RtpError`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RtpError>;

/// RTP transport errors
#[derive(Debug, Error)]
pub enum RtpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Packet pool exhausted")]
    PoolExhausted,

    #[error("{0} is not open")]
    NotOpen(&'static str),

    #[error("{0} is already open")]
    AlreadyOpen(&'static str),

    #[error("{0} has been closed")]
    Closed(&'static str),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Logging error: {0}")]
    Logging(#[from] logging::LoggingError),

    #[error("Config file error: {0}")]
    ConfigLoad(#[from] config_loader::ConfigError),
}
