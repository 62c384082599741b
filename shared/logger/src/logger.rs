//! Thread-safe asynchronous logger implementation.
//!
//! This module provides the main [`Logger`] interface for logging messages
//! to a file and/or the console without blocking the caller.

use crate::error::Result;
use crate::log_level::LogLevel;
use crate::log_message::LogMessage;
use crate::log_writer::{LogWriter, spawn_writer_thread};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Sender, channel};

/// Thread-safe, non-blocking logger.
///
/// Cloneable handles share the same channel to a dedicated writer thread.
/// [`Logger::for_component`] derives a handle that tags its messages with a
/// component name while still writing through the same sinks.
///
/// # Examples
///
/// ```
/// use logging::{Logger, LogLevel};
///
/// let logger = Logger::console(LogLevel::Info).unwrap();
/// let socket_logger = logger.for_component("RtpSocket");
/// socket_logger.info("Sender thread started");
/// ```
#[derive(Clone)]
pub struct Logger {
    sender: Option<Sender<LogMessage>>,
    level: LogLevel,
    component: Option<Arc<str>>,
}

impl Logger {
    /// Creates a logger writing to `log_path` (created if it doesn't exist).
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn new(log_path: PathBuf, level: LogLevel) -> Result<Self> {
        Self::from_settings(Some(log_path), level, false)
    }

    /// Creates a logger that only prints to standard output.
    pub fn console(level: LogLevel) -> Result<Self> {
        Self::from_settings(None, level, true)
    }

    /// Creates a logger that discards everything.
    ///
    /// No writer thread is started.
    pub fn disabled() -> Self {
        Logger {
            sender: None,
            level: LogLevel::Error,
            component: None,
        }
    }

    /// Creates a logger from explicit sink settings.
    ///
    /// # Arguments
    ///
    /// * `log_path` - File sink, `None` to skip file output
    /// * `level` - Minimum log level to record
    /// * `console_output` - Whether to echo records to standard output
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be opened or the writer thread
    /// cannot be spawned.
    pub fn from_settings(
        log_path: Option<PathBuf>,
        level: LogLevel,
        console_output: bool,
    ) -> Result<Self> {
        if log_path.is_none() && !console_output {
            return Ok(Self::disabled());
        }

        let writer = LogWriter::new(log_path.as_deref(), console_output)?;
        let (sender, receiver) = channel();
        spawn_writer_thread(writer, receiver)?;

        Ok(Logger {
            sender: Some(sender),
            level,
            component: None,
        })
    }

    /// Returns a handle sharing this logger's sinks and level, tagged with `component`.
    pub fn for_component(&self, component: &str) -> Self {
        Logger {
            sender: self.sender.clone(),
            level: self.level,
            component: Some(Arc::from(component)),
        }
    }

    /// Whether a message at `level` would be recorded.
    ///
    /// Lets hot paths skip building the message text.
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.sender.is_some() && level >= self.level
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if !self.is_enabled(level) {
            return;
        }
        if let Some(sender) = &self.sender {
            let msg = LogMessage::new(level, self.component.clone(), message.to_string());
            // A closed channel only means the writer thread is gone; nothing to report to.
            let _ = sender.send(msg);
        }
    }
}
