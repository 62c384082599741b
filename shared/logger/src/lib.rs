//! Thread-safe asynchronous logging library.
//!
//! Every [`Logger`] handle feeds one channel drained by a dedicated writer
//! thread, so logging from the RTP sender and receiver threads never waits
//! on file or console I/O.

pub mod error;
mod log_level;
mod log_message;
mod log_writer;
mod logger;

pub use error::{LoggingError, Result};
pub use log_level::LogLevel;
pub use logger::Logger;
