//! Asynchronous log writer.

use crate::error::{LoggingError, Result};
use crate::log_message::LogMessage;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc::Receiver;

/// Drains the logger channel into the configured sinks on a dedicated thread.
pub(crate) struct LogWriter {
    file: Option<File>,
    console: bool,
}

impl LogWriter {
    /// Creates a writer, opening or creating the file in append mode when a path is given.
    pub fn new(log_path: Option<&Path>, console: bool) -> Result<Self> {
        let file = match log_path {
            Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            None => None,
        };
        Ok(Self { file, console })
    }

    fn write_message(&mut self, message: &LogMessage) {
        let line = message.format();

        if self.console {
            print!("{}", line);
        }

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_all(line.as_bytes()) {
                eprintln!("Error writing log: {}", e);
                return;
            }
            if let Err(e) = file.flush() {
                eprintln!("Error flushing log: {}", e);
            }
        }
    }

    /// Runs the writer loop until every sender handle is dropped.
    pub fn run(mut self, receiver: Receiver<LogMessage>) {
        for message in receiver {
            self.write_message(&message);
        }
    }
}

/// Spawns the named writer thread.
pub(crate) fn spawn_writer_thread(writer: LogWriter, receiver: Receiver<LogMessage>) -> Result<()> {
    std::thread::Builder::new()
        .name("log-writer".to_string())
        .spawn(move || writer.run(receiver))
        .map_err(|e| LoggingError::Logging(format!("failed to spawn writer thread: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_level::LogLevel;
    use std::fs;
    use std::sync::mpsc::channel;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_log_writer_creates_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("rtp.log");

        let writer = LogWriter::new(Some(&log_path), false);
        assert!(writer.is_ok());
        assert!(log_path.exists());
    }

    #[test]
    fn test_log_writer_without_file() {
        let mut writer = LogWriter::new(None, false).unwrap();
        writer.write_message(&LogMessage::new(LogLevel::Info, None, "dropped".to_string()));
    }

    #[test]
    fn test_spawn_writer_thread() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("rtp.log");
        let (sender, receiver) = channel();

        let writer = LogWriter::new(Some(&log_path), false).unwrap();
        spawn_writer_thread(writer, receiver).unwrap();

        sender
            .send(LogMessage::new(LogLevel::Debug, None, "Thread test".to_string()))
            .unwrap();
        drop(sender);

        thread::sleep(Duration::from_millis(100));

        let content = fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Thread test"));
    }
}
