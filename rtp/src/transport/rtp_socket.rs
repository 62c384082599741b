//! RTP sending socket
//!
//! [`RtpSocket`] owns the packet pool, a UDP socket and the stream's
//! [`RtcpSocket`]. Packetizers fill pooled buffers and queue them through the
//! [`PacketSink`] implementation; a dedicated sender thread puts them on the
//! wire, feeds the RTCP counters and returns the buffers to the pool.
//!
//! # Examples
//! ```no_run
//! use logging::Logger;
//! use rtp::{OpusRtpPacketizer, RtpPacketizer, RtpSocket, TransportConfig};
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! let logger = Logger::disabled();
//! let mut socket = RtpSocket::new(&TransportConfig::default(), &logger).unwrap();
//! socket
//!     .set_destination(IpAddr::V4(Ipv4Addr::LOCALHOST), 5004, 5005)
//!     .unwrap();
//! socket.open().unwrap();
//!
//! let mut packetizer = OpusRtpPacketizer::new(111, &logger);
//! packetizer.write(&socket, &[0xFC, 0x01, 0x02], 20_000);
//!
//! socket.close();
//! ```

use super::pool::{PacketPool, PooledPacket};
use super::rtcp_socket::RtcpSocket;
use super::udp::bind_udp;
use crate::config::TransportConfig;
use crate::error::{Result, RtpError};
use crate::traits::PacketSink;
use crate::utils::thread::{join_with_timeout, lock};
use logging::{LogLevel, Logger};
use rand::Rng;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const NAME: &str = "RtpSocket";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketState {
    Idle,
    Open,
    Closed,
}

/// Remote end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Destination {
    address: IpAddr,
    rtp_port: u16,
    rtcp_port: u16,
}

/// Snapshot of the socket counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    /// Packets released without being sent (socket not open or send failure)
    pub packets_dropped: u64,
    pub rtcp_reports_sent: u64,
    /// Buffers currently claimed from the pool
    pub pool_in_use: usize,
}

#[derive(Debug, Default)]
struct Counters {
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    packets_dropped: AtomicU64,
    rtcp_reports_sent: AtomicU64,
}

/// State moved into the sender thread.
struct SenderContext {
    socket: Arc<UdpSocket>,
    destination: SocketAddr,
    rtcp: Arc<Mutex<RtcpSocket>>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    logger: Logger,
}

/// UDP socket sending the RTP packets of one stream.
pub struct RtpSocket {
    socket: Arc<UdpSocket>,
    rtcp: Arc<Mutex<RtcpSocket>>,
    pool: PacketPool,
    ssrc: u32,
    local_ports: (u16, u16),
    destination: Option<Destination>,
    state: Mutex<SocketState>,
    sender: Mutex<Option<Sender<PooledPacket>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    join_timeout: Duration,
    logger: Logger,
}

impl RtpSocket {
    /// Binds the RTP and RTCP sockets on ephemeral ports and picks a random SSRC.
    ///
    /// # Errors
    /// `Config` if `config` does not validate, `Io` if a socket can't be bound.
    pub fn new(config: &TransportConfig, logger: &Logger) -> Result<Self> {
        config.validate()?;
        let logger = logger.for_component(NAME);

        let socket = bind_udp(0, config, &logger)?;
        let rtcp = RtcpSocket::open(config, &logger)?;
        let local_ports = (socket.local_addr()?.port(), rtcp.local_port());
        let ssrc = rand::thread_rng().gen_range(0..=u32::MAX);

        logger.info(&format!(
            "RTP socket bound on ports {}/{} with SSRC {:#010x}",
            local_ports.0, local_ports.1, ssrc
        ));

        Ok(RtpSocket {
            socket: Arc::new(socket),
            rtcp: Arc::new(Mutex::new(rtcp)),
            pool: PacketPool::new(config.pool_size, config.mtu),
            ssrc,
            local_ports,
            destination: None,
            state: Mutex::new(SocketState::Idle),
            sender: Mutex::new(None),
            handle: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            join_timeout: config.join_timeout(),
            logger,
        })
    }

    fn ensure_idle(&self) -> Result<()> {
        match *lock(&self.state) {
            SocketState::Idle => Ok(()),
            SocketState::Open => Err(RtpError::AlreadyOpen(NAME)),
            SocketState::Closed => Err(RtpError::Closed(NAME)),
        }
    }

    /// Sets where RTP and RTCP packets are sent. Only allowed before `open()`.
    pub fn set_destination(&mut self, address: IpAddr, rtp_port: u16, rtcp_port: u16) -> Result<()> {
        self.ensure_idle()?;
        self.destination = Some(Destination {
            address,
            rtp_port,
            rtcp_port,
        });
        Ok(())
    }

    /// Overrides the random SSRC. Only allowed before `open()`.
    pub fn set_ssrc(&mut self, ssrc: u32) -> Result<()> {
        self.ensure_idle()?;
        self.ssrc = ssrc;
        Ok(())
    }

    /// Starts the sender thread. Opening an open socket does nothing.
    ///
    /// # Errors
    /// `Closed` after `close()`, `Config` if no destination was set,
    /// `Thread` if the sender thread can't be spawned.
    pub fn open(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match *state {
            SocketState::Open => return Ok(()),
            SocketState::Closed => return Err(RtpError::Closed(NAME)),
            SocketState::Idle => {}
        }

        let destination = self
            .destination
            .ok_or_else(|| RtpError::Config("RTP destination not set".to_string()))?;

        {
            let mut rtcp = lock(&self.rtcp);
            rtcp.set_destination(destination.address, destination.rtcp_port);
            rtcp.set_ssrc(self.ssrc);
            rtcp.reset_timer();
        }

        let (tx, rx) = channel::<PooledPacket>();
        self.running.store(true, Ordering::Release);

        let context = SenderContext {
            socket: Arc::clone(&self.socket),
            destination: SocketAddr::new(destination.address, destination.rtp_port),
            rtcp: Arc::clone(&self.rtcp),
            running: Arc::clone(&self.running),
            counters: Arc::clone(&self.counters),
            logger: self.logger.clone(),
        };

        let handle = thread::Builder::new()
            .name("rtp-sender".to_string())
            .spawn(move || run_sender_thread(rx, context))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                RtpError::Thread(format!("Failed to spawn sender thread: {}", e))
            })?;

        *lock(&self.sender) = Some(tx);
        *lock(&self.handle) = Some(handle);
        *state = SocketState::Open;

        self.logger.info(&format!(
            "Sending to {}:{} (RTCP {})",
            destination.address, destination.rtp_port, destination.rtcp_port
        ));
        Ok(())
    }

    /// Stops the sender thread and closes the RTCP socket.
    ///
    /// Waits at most the configured join timeout for the thread; packets
    /// still queued are released unsent. Closing twice does nothing.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        if *state == SocketState::Closed {
            return;
        }
        *state = SocketState::Closed;

        self.running.store(false, Ordering::Release);
        // Disconnects the channel so a blocked receive returns
        lock(&self.sender).take();

        if let Some(handle) = lock(&self.handle).take()
            && !join_with_timeout(handle, self.join_timeout)
        {
            self.logger.warn(&format!(
                "Sender thread did not stop within {:?}, abandoning it",
                self.join_timeout
            ));
        }

        // The sender thread may still hold the RTCP socket; it closes it on exit
        match self.rtcp.try_lock() {
            Ok(mut rtcp) => rtcp.close(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().close(),
            Err(TryLockError::WouldBlock) => {
                self.logger.debug("RTCP socket busy, left to the sender thread");
            }
        }
        self.logger.info("RTP socket closed");
    }

    pub fn is_open(&self) -> bool {
        *lock(&self.state) == SocketState::Open
    }

    /// Local (RTP, RTCP) ports.
    pub fn local_ports(&self) -> (u16, u16) {
        self.local_ports
    }

    /// Remote (RTP, RTCP) ports, once a destination is set.
    pub fn remote_ports(&self) -> Option<(u16, u16)> {
        self.destination.map(|d| (d.rtp_port, d.rtcp_port))
    }

    pub fn remote_address(&self) -> Option<IpAddr> {
        self.destination.map(|d| d.address)
    }

    pub fn stats(&self) -> SocketStats {
        SocketStats {
            packets_sent: self.counters.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
            packets_dropped: self.counters.packets_dropped.load(Ordering::Relaxed),
            rtcp_reports_sent: self.counters.rtcp_reports_sent.load(Ordering::Relaxed),
            pool_in_use: self.pool.in_use(),
        }
    }

    /// The stream's RTCP socket, e.g. to change the report interval.
    pub fn rtcp(&self) -> &Arc<Mutex<RtcpSocket>> {
        &self.rtcp
    }
}

fn run_sender_thread(rx: Receiver<PooledPacket>, context: SenderContext) {
    context.logger.debug("Sender thread started");

    while let Ok(packet) = rx.recv() {
        if !context.running.load(Ordering::Acquire) {
            context.counters.packets_dropped.fetch_add(1, Ordering::Relaxed);
            break;
        }

        match context.socket.send_to(packet.as_bytes(), context.destination) {
            Ok(sent) => {
                context.counters.packets_sent.fetch_add(1, Ordering::Relaxed);
                context
                    .counters
                    .bytes_sent
                    .fetch_add(sent as u64, Ordering::Relaxed);
                let mut rtcp = lock(&context.rtcp);
                rtcp.update(packet.payload_length(), packet.timestamp());
                context
                    .counters
                    .rtcp_reports_sent
                    .store(rtcp.reports_sent(), Ordering::Relaxed);
            }
            Err(e) => {
                context.counters.packets_dropped.fetch_add(1, Ordering::Relaxed);
                if context.logger.is_enabled(LogLevel::Debug) {
                    context.logger.debug(&format!("RTP send failed: {}", e));
                }
            }
        }
        // Dropping the packet returns its buffer to the pool
    }

    lock(&context.rtcp).close();
    context.logger.debug("Sender thread stopped");
}

impl PacketSink for RtpSocket {
    fn acquire(&self) -> Option<PooledPacket> {
        self.pool.acquire()
    }

    fn send(&self, packet: PooledPacket) {
        let sender = lock(&self.sender);
        let queued = match sender.as_ref() {
            Some(tx) => tx.send(packet).is_ok(),
            None => false,
        };
        if !queued {
            self.counters.packets_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn ssrc(&self) -> u32 {
        self.ssrc
    }

    fn mtu(&self) -> usize {
        self.pool.mtu()
    }
}

impl Drop for RtpSocket {
    fn drop(&mut self) {
        self.close();
    }
}
