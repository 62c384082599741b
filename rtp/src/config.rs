//! Transport configuration
//!
//! Every field has a default, so a partial (or empty) JSON document is a
//! valid configuration:
//!
//! ```json
//! {
//!     "mtu": 1300,
//!     "rtcp_interval_ms": 5000,
//!     "logging": { "log_level": "debug", "enable_file": false }
//! }
//! ```

use crate::codec::rtp::RtpHeader;
use crate::error::{Result, RtpError};
use logging::{LogLevel, Logger};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest UDP payload over IPv4.
const MAX_UDP_PAYLOAD: usize = 65_507;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_file_path: String,
    pub log_level: String,
    pub enable_console: bool,
    pub enable_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_file_path: "rtp.log".to_string(),
            log_level: "info".to_string(),
            enable_console: false,
            enable_file: true,
        }
    }
}

impl LoggingConfig {
    /// Builds a [`Logger`] with the configured sinks and level.
    ///
    /// # Errors
    ///
    /// Returns `RtpError::Logging` for an unknown level or an unwritable file.
    pub fn create_logger(&self) -> Result<Logger> {
        let level: LogLevel = self.log_level.parse()?;
        let path = self
            .enable_file
            .then(|| PathBuf::from(&self.log_file_path));
        Ok(Logger::from_settings(path, level, self.enable_console)?)
    }
}

/// Configuration shared by the RTP/RTCP sockets and the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Local address every socket binds to
    pub bind_address: IpAddr,
    /// Packet buffer size in bytes (RTP header included)
    pub mtu: usize,
    /// Number of packet buffers owned by each `RtpSocket`
    pub pool_size: usize,
    /// Minimum time between two RTCP Sender Reports
    pub rtcp_interval_ms: u64,
    /// TTL for unicast and multicast datagrams
    pub ttl: u32,
    /// IPv4 TOS byte (0xB8 = DSCP EF)
    pub traffic_class: u32,
    /// Upper bound on how long `close()` waits for a worker thread
    pub join_timeout_ms: u64,
    /// Receive poll interval of listener threads
    pub read_timeout_ms: u64,
    /// Receive buffer size of listener threads
    pub receive_buffer_size: usize,
    pub logging: LoggingConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            mtu: 1300,
            pool_size: 300,
            rtcp_interval_ms: 3000,
            ttl: 64,
            traffic_class: 0xB8,
            join_timeout_ms: 500,
            read_timeout_ms: 100,
            receive_buffer_size: 65_536,
            logging: LoggingConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: TransportConfig = config_loader::load_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Looks for `filename` in the usual places (see `config_loader::find_config_file`)
    /// and loads it.
    pub fn find_and_load(filename: &str) -> Result<Self> {
        let path = config_loader::find_config_file(filename)?;
        Self::load_from_file(path)
    }

    /// Checks the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.mtu <= RtpHeader::SIZE || self.mtu > MAX_UDP_PAYLOAD {
            return Err(RtpError::Config(format!(
                "mtu must be in {}..={}, got {}",
                RtpHeader::SIZE + 1,
                MAX_UDP_PAYLOAD,
                self.mtu
            )));
        }
        if self.pool_size == 0 {
            return Err(RtpError::Config("pool_size must be positive".to_string()));
        }
        if self.rtcp_interval_ms == 0 {
            return Err(RtpError::Config(
                "rtcp_interval_ms must be positive".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 || self.read_timeout_ms >= self.join_timeout_ms {
            return Err(RtpError::Config(format!(
                "read_timeout_ms ({}) must be positive and below join_timeout_ms ({})",
                self.read_timeout_ms, self.join_timeout_ms
            )));
        }
        if self.receive_buffer_size < self.mtu {
            return Err(RtpError::Config(format!(
                "receive_buffer_size ({}) must hold at least one mtu ({})",
                self.receive_buffer_size, self.mtu
            )));
        }
        Ok(())
    }

    pub fn rtcp_interval(&self) -> Duration {
        Duration::from_millis(self.rtcp_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Sets the local bind address.
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Sets the MTU.
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Sets the packet pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Sets the RTCP report interval.
    pub fn with_rtcp_interval(mut self, interval: Duration) -> Self {
        self.rtcp_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the bounded join timeout used by `close()`.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the listener poll interval.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}
