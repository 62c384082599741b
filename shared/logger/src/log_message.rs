//! Internal log message structure.

use crate::log_level::LogLevel;
use chrono::Local;
use std::sync::Arc;

/// A single record travelling from a [`crate::Logger`] handle to the writer.
#[derive(Debug, Clone)]
pub(crate) struct LogMessage {
    pub timestamp: String,
    pub level: LogLevel,
    pub component: Option<Arc<str>>,
    pub thread: Option<String>,
    pub message: String,
}

impl LogMessage {
    /// Stamps a message with the current local time and the calling thread's name.
    pub fn new(level: LogLevel, component: Option<Arc<str>>, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level,
            component,
            thread: std::thread::current().name().map(str::to_string),
            message,
        }
    }

    /// Formats message for output: `[timestamp] LEVEL [component] (thread): message\n`
    pub fn format(&self) -> String {
        let mut line = format!("[{}] {}", self.timestamp, self.level.as_str());
        if let Some(component) = &self.component {
            line.push_str(&format!(" [{}]", component));
        }
        if let Some(thread) = &self.thread {
            line.push_str(&format!(" ({})", thread));
        }
        line.push_str(": ");
        line.push_str(&self.message);
        line.push('\n');
        line
    }
}
