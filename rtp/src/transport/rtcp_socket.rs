//! RTCP socket emitting Sender Reports
//!
//! Reports are not timer driven: every RTP packet that leaves the sender
//! thread goes through [`RtcpSocket::update`], which sends a report once the
//! configured interval has elapsed. A silent stream sends no reports.

use super::udp::bind_udp;
use crate::codec::rtcp::{SenderReport, SenderStats, monotonic_nanos};
use crate::config::TransportConfig;
use crate::error::Result;
use logging::{LogLevel, Logger};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

/// Sender side of RTCP for one RTP stream.
pub struct RtcpSocket {
    socket: Option<UdpSocket>,
    local_port: u16,
    destination: Option<SocketAddr>,
    stats: SenderStats,
    interval: Duration,
    last_report: Instant,
    logger: Logger,
}

impl RtcpSocket {
    /// Binds an ephemeral UDP socket and starts the report interval.
    pub fn open(config: &TransportConfig, logger: &Logger) -> Result<Self> {
        let logger = logger.for_component("RtcpSocket");
        let socket = bind_udp(0, config, &logger)?;
        let local_port = socket.local_addr()?.port();

        logger.info(&format!("RTCP socket open on port {}", local_port));

        Ok(RtcpSocket {
            socket: Some(socket),
            local_port,
            destination: None,
            stats: SenderStats::default(),
            interval: config.rtcp_interval(),
            last_report: Instant::now(),
            logger,
        })
    }

    pub fn set_destination(&mut self, address: IpAddr, port: u16) {
        self.destination = Some(SocketAddr::new(address, port));
    }

    pub fn set_ssrc(&mut self, ssrc: u32) {
        self.stats.ssrc = ssrc;
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Restarts the report interval from now.
    pub(crate) fn reset_timer(&mut self) {
        self.last_report = Instant::now();
    }

    /// Accounts for one sent RTP packet and emits a report if one is due.
    pub fn update(&mut self, payload_length: usize, rtp_timestamp: u32) {
        self.stats.update_sender(payload_length, rtp_timestamp);

        if self.socket.is_none() || self.last_report.elapsed() < self.interval {
            return;
        }
        self.last_report = Instant::now();
        self.send_report(rtp_timestamp);
    }

    fn send_report(&mut self, rtp_timestamp: u32) {
        let (Some(socket), Some(destination)) = (self.socket.as_ref(), self.destination) else {
            return;
        };

        let report = SenderReport::new(&self.stats, rtp_timestamp, monotonic_nanos());
        match socket.send_to(&report.to_bytes(), destination) {
            Ok(_) => {
                self.stats.reports_sent += 1;
                if self.logger.is_enabled(LogLevel::Debug) {
                    self.logger.debug(&format!(
                        "Sender Report to {}: {} packets, {} octets",
                        destination, self.stats.packet_count, self.stats.octet_count
                    ));
                }
            }
            Err(e) => self
                .logger
                .debug(&format!("Cannot send Sender Report: {}", e)),
        }
    }

    /// Releases the socket. Counters stay readable.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            self.logger.info("RTCP socket closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn ssrc(&self) -> u32 {
        self.stats.ssrc
    }

    pub fn packet_count(&self) -> u32 {
        self.stats.packet_count
    }

    pub fn octet_count(&self) -> u32 {
        self.stats.octet_count
    }

    pub fn reports_sent(&self) -> u64 {
        self.stats.reports_sent
    }
}
