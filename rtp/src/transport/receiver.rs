//! RTP/RTCP receiving endpoint
//!
//! One listener thread per bound port. Threads poll with a short read
//! timeout so `close()` is observed promptly, and hand every datagram to the
//! [`ReceiverListener`] synchronously on the listener thread.

use super::udp::bind_udp;
use crate::config::TransportConfig;
use crate::error::{Result, RtpError};
use crate::traits::ReceiverListener;
use crate::utils::port_finder::find_port_pair;
use crate::utils::thread::{join_with_timeout, lock};
use logging::{LogLevel, Logger};
use std::io::{self, ErrorKind};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const NAME: &str = "RtpReceiver";

const BITRATE_WINDOW: Duration = Duration::from_secs(1);

type SharedListener = Arc<RwLock<Option<Arc<dyn ReceiverListener>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiverState {
    Idle,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Rtp,
    Rtcp,
}

/// Received byte counters and the bitrate of the last full window.
#[derive(Debug)]
struct ReceiveStats {
    total_bytes: AtomicU64,
    window: Mutex<BitrateWindow>,
}

#[derive(Debug)]
struct BitrateWindow {
    started: Instant,
    bytes: u64,
    bitrate: u64,
}

impl ReceiveStats {
    fn new() -> Self {
        ReceiveStats {
            total_bytes: AtomicU64::new(0),
            window: Mutex::new(BitrateWindow {
                started: Instant::now(),
                bytes: 0,
                bitrate: 0,
            }),
        }
    }

    fn record(&self, size: usize) {
        self.total_bytes.fetch_add(size as u64, Ordering::Relaxed);

        let mut window = lock(&self.window);
        let elapsed = window.started.elapsed();
        if elapsed >= BITRATE_WINDOW {
            window.bitrate = window.bytes * 8 * 1000 / elapsed.as_millis().max(1) as u64;
            window.bytes = 0;
            window.started = Instant::now();
        }
        window.bytes += size as u64;
    }
}

/// State moved into a listener thread.
struct ListenerContext {
    socket: UdpSocket,
    channel: Channel,
    listener: SharedListener,
    running: Arc<AtomicBool>,
    stats: Arc<ReceiveStats>,
    buffer_size: usize,
    /// Pause after a failed receive so a persistent error can't spin the thread
    error_backoff: Duration,
    logger: Logger,
}

/// Receives RTP (and optionally RTCP) datagrams on local ports.
pub struct RtpReceiver {
    ports: Mutex<(u16, Option<u16>)>,
    config: TransportConfig,
    listener: SharedListener,
    state: Mutex<ReceiverState>,
    running: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<ReceiveStats>,
    logger: Logger,
}

impl RtpReceiver {
    /// Creates a receiver for `rtp_port` and, if given, `rtcp_port`.
    ///
    /// Port 0 binds an ephemeral port; the actual one is reported by
    /// [`rtp_port`](Self::rtp_port) after `open()`. Nothing is bound yet.
    pub fn new(
        rtp_port: u16,
        rtcp_port: Option<u16>,
        config: &TransportConfig,
        logger: &Logger,
    ) -> Self {
        RtpReceiver {
            ports: Mutex::new((rtp_port, rtcp_port)),
            config: config.clone(),
            listener: Arc::new(RwLock::new(None)),
            state: Mutex::new(ReceiverState::Idle),
            running: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
            stats: Arc::new(ReceiveStats::new()),
            logger: logger.for_component(NAME),
        }
    }

    /// Creates a receiver on the first free even/odd RTP/RTCP port pair at or
    /// after `start`.
    ///
    /// # Errors
    /// `Config` if no pair is free within the search range.
    pub fn with_port_pair(start: u16, config: &TransportConfig, logger: &Logger) -> Result<Self> {
        let (rtp_port, rtcp_port) = find_port_pair(start, logger)?;
        Ok(Self::new(rtp_port, Some(rtcp_port), config, logger))
    }

    /// Sets the callbacks; replaces any previous listener, also while open.
    pub fn set_listener(&self, listener: Arc<dyn ReceiverListener>) {
        *self
            .listener
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(listener);
    }

    fn notify_error(&self, error: &RtpError) {
        if let Some(listener) = current_listener(&self.listener) {
            listener.on_error(error);
        }
    }

    /// Binds the ports and starts the listener threads. Idempotent.
    ///
    /// # Errors
    /// `Closed` after `close()`. Bind and spawn failures are reported to the
    /// listener's `on_error` and returned.
    pub fn open(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match *state {
            ReceiverState::Open => return Ok(()),
            ReceiverState::Closed => return Err(RtpError::Closed(NAME)),
            ReceiverState::Idle => {}
        }

        let (rtp_port, rtcp_port) = *lock(&self.ports);
        let sockets = self.bind_sockets(rtp_port, rtcp_port).inspect_err(|e| {
            self.logger.error(&format!("Cannot open receiver: {}", e));
            self.notify_error(e);
        })?;

        let mut bound = (0, None);
        for (socket, channel) in &sockets {
            let port = socket.local_addr()?.port();
            match channel {
                Channel::Rtp => bound.0 = port,
                Channel::Rtcp => bound.1 = Some(port),
            }
        }

        self.running.store(true, Ordering::Release);
        let mut handles = Vec::with_capacity(sockets.len());
        for (socket, channel) in sockets {
            match self.spawn_listener(socket, channel) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.running.store(false, Ordering::Release);
                    self.notify_error(&e);
                    return Err(e);
                }
            }
        }

        *lock(&self.ports) = bound;
        *lock(&self.handles) = handles;
        *state = ReceiverState::Open;

        self.logger.info(&format!(
            "Receiving RTP on port {}{}",
            bound.0,
            bound
                .1
                .map(|port| format!(", RTCP on port {}", port))
                .unwrap_or_default()
        ));
        Ok(())
    }

    fn bind_sockets(
        &self,
        rtp_port: u16,
        rtcp_port: Option<u16>,
    ) -> Result<Vec<(UdpSocket, Channel)>> {
        let mut sockets = vec![(self.bind_one(rtp_port)?, Channel::Rtp)];
        if let Some(port) = rtcp_port {
            sockets.push((self.bind_one(port)?, Channel::Rtcp));
        }
        Ok(sockets)
    }

    fn bind_one(&self, port: u16) -> Result<UdpSocket> {
        let socket = bind_udp(port, &self.config, &self.logger)?;
        socket.set_read_timeout(Some(self.config.read_timeout()))?;
        Ok(socket)
    }

    fn spawn_listener(&self, socket: UdpSocket, channel: Channel) -> Result<JoinHandle<()>> {
        let context = ListenerContext {
            socket,
            channel,
            listener: Arc::clone(&self.listener),
            running: Arc::clone(&self.running),
            stats: Arc::clone(&self.stats),
            buffer_size: self.config.receive_buffer_size,
            error_backoff: self.config.read_timeout(),
            logger: self.logger.clone(),
        };
        let name = match channel {
            Channel::Rtp => "rtp-receiver",
            Channel::Rtcp => "rtcp-receiver",
        };

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_listener_thread(context))
            .map_err(|e| RtpError::Thread(format!("Failed to spawn {} thread: {}", name, e)))
    }

    /// Stops the listener threads.
    ///
    /// All threads share one join deadline of the configured timeout.
    /// Closing twice does nothing.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        if *state == ReceiverState::Closed {
            return;
        }
        *state = ReceiverState::Closed;
        self.running.store(false, Ordering::Release);

        let deadline = Instant::now() + self.config.join_timeout();
        for handle in lock(&self.handles).drain(..) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !join_with_timeout(handle, remaining) {
                self.logger
                    .warn("Listener thread did not stop in time, abandoning it");
            }
        }
        self.logger.info("Receiver closed");
    }

    pub fn is_open(&self) -> bool {
        *lock(&self.state) == ReceiverState::Open
    }

    /// RTP port; the bound port once open.
    pub fn rtp_port(&self) -> u16 {
        lock(&self.ports).0
    }

    /// RTCP port, `None` if RTCP reception is disabled.
    pub fn rtcp_port(&self) -> Option<u16> {
        lock(&self.ports).1
    }

    /// Total RTP bytes received.
    pub fn received_size(&self) -> u64 {
        self.stats.total_bytes.load(Ordering::Relaxed)
    }

    /// RTP bits per second over the last complete one-second window.
    pub fn bitrate(&self) -> u64 {
        lock(&self.stats.window).bitrate
    }
}

fn current_listener(listener: &SharedListener) -> Option<Arc<dyn ReceiverListener>> {
    listener
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn run_listener_thread(context: ListenerContext) {
    let mut buffer = vec![0u8; context.buffer_size];
    context
        .logger
        .debug(&format!("{:?} listener thread started", context.channel));

    while context.running.load(Ordering::Acquire) {
        match context.socket.recv_from(&mut buffer) {
            Ok((size, _)) => {
                let data = &buffer[..size];
                let listener = current_listener(&context.listener);
                match context.channel {
                    Channel::Rtp => {
                        context.stats.record(size);
                        if let Some(listener) = listener {
                            listener.on_rtp_received(data);
                        }
                    }
                    Channel::Rtcp => {
                        if let Some(listener) = listener {
                            listener.on_rtcp_received(data);
                        }
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => report_receive_error(&context, e),
        }
    }

    context
        .logger
        .debug(&format!("{:?} listener thread stopped", context.channel));
}

fn report_receive_error(context: &ListenerContext, error: io::Error) {
    if context.logger.is_enabled(LogLevel::Debug) {
        context.logger.debug(&format!("Receive failed: {}", error));
    }
    if let Some(listener) = current_listener(&context.listener) {
        listener.on_error(&RtpError::Io(error));
    }
    thread::sleep(context.error_backoff);
}

impl Drop for RtpReceiver {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback_config() -> TransportConfig {
        TransportConfig::default()
            .with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_read_timeout(Duration::from_millis(20))
    }

    #[derive(Default)]
    struct Recording {
        rtp: Mutex<Vec<Vec<u8>>>,
        rtcp: Mutex<Vec<Vec<u8>>>,
        errors: Mutex<Vec<String>>,
    }

    impl ReceiverListener for Recording {
        fn on_rtp_received(&self, data: &[u8]) {
            self.rtp.lock().unwrap().push(data.to_vec());
        }

        fn on_rtcp_received(&self, data: &[u8]) {
            self.rtcp.lock().unwrap().push(data.to_vec());
        }

        fn on_error(&self, error: &RtpError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_receives_rtp_and_rtcp() {
        let receiver = RtpReceiver::new(0, Some(0), &loopback_config(), &Logger::disabled());
        let recording = Arc::new(Recording::default());
        receiver.set_listener(recording.clone());
        receiver.open().unwrap();

        let rtp_port = receiver.rtp_port();
        let rtcp_port = receiver.rtcp_port().unwrap();
        assert_ne!(rtp_port, 0);
        assert_ne!(rtcp_port, 0);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&[0x80, 96, 0, 1], ("127.0.0.1", rtp_port)).unwrap();
        sender.send_to(&[0x80, 200, 0, 6], ("127.0.0.1", rtcp_port)).unwrap();

        assert!(wait_for(|| recording.rtp.lock().unwrap().len() == 1
            && recording.rtcp.lock().unwrap().len() == 1));
        assert_eq!(recording.rtp.lock().unwrap()[0], vec![0x80, 96, 0, 1]);
        assert_eq!(receiver.received_size(), 4);

        receiver.close();
    }

    #[test]
    fn test_rtcp_disabled() {
        let receiver = RtpReceiver::new(0, None, &loopback_config(), &Logger::disabled());
        receiver.open().unwrap();

        assert!(receiver.rtcp_port().is_none());
        assert_eq!(lock(&receiver.handles).len(), 1);
    }

    #[test]
    fn test_bind_failure_reported() {
        let occupied = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let receiver = RtpReceiver::new(port, None, &loopback_config(), &Logger::disabled());
        let recording = Arc::new(Recording::default());
        receiver.set_listener(recording.clone());

        assert!(matches!(receiver.open(), Err(RtpError::Io(_))));
        assert_eq!(recording.errors.lock().unwrap().len(), 1);
        assert!(!receiver.is_open());
    }

    #[test]
    fn test_open_is_idempotent() {
        let receiver = RtpReceiver::new(0, None, &loopback_config(), &Logger::disabled());
        receiver.open().unwrap();
        let port = receiver.rtp_port();

        receiver.open().unwrap();
        assert_eq!(receiver.rtp_port(), port);
    }

    #[test]
    fn test_close_is_bounded_and_idempotent() {
        let receiver = RtpReceiver::new(0, Some(0), &loopback_config(), &Logger::disabled());
        receiver.open().unwrap();

        let start = Instant::now();
        receiver.close();
        receiver.close();
        assert!(start.elapsed() < Duration::from_millis(600));
        assert!(matches!(receiver.open(), Err(RtpError::Closed(_))));
    }

    struct Stalling {
        entered: AtomicBool,
    }

    impl ReceiverListener for Stalling {
        fn on_rtp_received(&self, _data: &[u8]) {
            self.entered.store(true, Ordering::Release);
            thread::sleep(Duration::from_secs(2));
        }

        fn on_rtcp_received(&self, _data: &[u8]) {}

        fn on_error(&self, _error: &RtpError) {}
    }

    #[test]
    fn test_close_bounded_while_callback_blocks() {
        let receiver = RtpReceiver::new(0, Some(0), &loopback_config(), &Logger::disabled());
        let stalling = Arc::new(Stalling {
            entered: AtomicBool::new(false),
        });
        receiver.set_listener(stalling.clone());
        receiver.open().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(&[0x80, 96, 0, 1], ("127.0.0.1", receiver.rtp_port()))
            .unwrap();
        assert!(wait_for(|| stalling.entered.load(Ordering::Acquire)));

        let start = Instant::now();
        receiver.close();
        assert!(start.elapsed() < Duration::from_millis(600));
        assert!(!receiver.is_open());
    }

    #[test]
    fn test_receive_error_backs_off() {
        let recording = Arc::new(Recording::default());
        let listener: Arc<dyn ReceiverListener> = recording.clone();
        let context = ListenerContext {
            socket: UdpSocket::bind("127.0.0.1:0").unwrap(),
            channel: Channel::Rtp,
            listener: Arc::new(RwLock::new(Some(listener))),
            running: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(ReceiveStats::new()),
            buffer_size: 1500,
            error_backoff: Duration::from_millis(50),
            logger: Logger::disabled(),
        };

        let start = Instant::now();
        report_receive_error(&context, io::Error::new(ErrorKind::ConnectionRefused, "refused"));

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(recording.errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_with_port_pair() {
        let receiver =
            RtpReceiver::with_port_pair(41_000, &loopback_config(), &Logger::disabled()).unwrap();
        let rtp_port = receiver.rtp_port();
        assert_eq!(rtp_port % 2, 0);
        assert_eq!(receiver.rtcp_port(), Some(rtp_port + 1));

        receiver.open().unwrap();
        assert_eq!(receiver.rtp_port(), rtp_port);
        assert_eq!(receiver.rtcp_port(), Some(rtp_port + 1));
    }

    #[test]
    fn test_bitrate_window() {
        let stats = ReceiveStats::new();
        stats.record(500);
        assert_eq!(stats.total_bytes.load(Ordering::Relaxed), 500);
        assert_eq!(lock(&stats.window).bitrate, 0);

        lock(&stats.window).started = Instant::now() - Duration::from_secs(1);
        stats.record(100);

        let bitrate = lock(&stats.window).bitrate;
        assert!((3_900..=4_000).contains(&bitrate), "bitrate {}", bitrate);
        assert_eq!(lock(&stats.window).bytes, 100);
    }
}
