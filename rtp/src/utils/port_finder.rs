//! UDP port discovery utilities

use crate::error::{Result, RtpError};
use logging::Logger;
use std::net::UdpSocket;

/// Number of candidates tried before giving up.
const SEARCH_RANGE: u16 = 100;

/// Finds an available UDP port starting from the given port.
///
/// # Arguments
/// * `start` - Starting port number to try
/// * `logger` - Logger for warnings when the preferred port is occupied
///
/// # Errors
/// `RtpError::Config` if no port is available in `[start, start + 100)`.
pub fn find_available_port(start: u16, logger: &Logger) -> Result<u16> {
    candidates(start)
        .find(|&port| is_port_available(port))
        .inspect(|&port| {
            if port != start {
                logger.warn(&format!("Port {} occupied, using {} instead", start, port));
            }
        })
        .ok_or_else(|| no_port_error(start))
}

/// Finds an even RTP port whose odd successor is free for RTCP.
///
/// An odd `start` is rounded up to the next even port.
pub fn find_port_pair(start: u16, logger: &Logger) -> Result<(u16, u16)> {
    let first = start.saturating_add(start % 2);
    candidates(first)
        .step_by(2)
        .find(|&port| port < u16::MAX && is_port_available(port) && is_port_available(port + 1))
        .inspect(|&port| {
            if port != first {
                logger.warn(&format!(
                    "Ports {}/{} occupied, using {}/{} instead",
                    first,
                    first.saturating_add(1),
                    port,
                    port + 1
                ));
            }
        })
        .map(|port| (port, port + 1))
        .ok_or_else(|| no_port_error(first))
}

fn candidates(start: u16) -> std::ops::Range<u16> {
    start..start.saturating_add(SEARCH_RANGE)
}

fn no_port_error(start: u16) -> RtpError {
    RtpError::Config(format!(
        "No available ports in range {}-{}",
        start,
        start.saturating_add(SEARCH_RANGE)
    ))
}

fn is_port_available(port: u16) -> bool {
    UdpSocket::bind(("0.0.0.0", port)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_logger() -> Logger {
        use logging::LogLevel;
        use tempfile::tempdir;
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");
        Logger::new(log_path, LogLevel::Debug).unwrap()
    }

    #[test]
    fn test_find_available_port() {
        let logger = create_test_logger();

        let port = find_available_port(50000, &logger).unwrap();
        assert!((50000..50100).contains(&port));
    }

    #[test]
    fn test_find_available_port_with_occupied() {
        let logger = create_test_logger();

        let occupied_port = 55000;
        let _socket = UdpSocket::bind(("0.0.0.0", occupied_port)).unwrap();

        let port = find_available_port(occupied_port, &logger).unwrap();

        assert_ne!(port, occupied_port);
        assert!(port > occupied_port);
        assert!(port < occupied_port + 100);
    }

    #[test]
    fn test_port_actually_bindable() {
        let logger = create_test_logger();

        let port = find_available_port(40000, &logger).unwrap();
        assert!(UdpSocket::bind(("0.0.0.0", port)).is_ok());
    }

    #[test]
    fn test_find_port_pair_even_odd() {
        let logger = create_test_logger();

        let (rtp, rtcp) = find_port_pair(47001, &logger).unwrap();
        assert_eq!(rtp % 2, 0);
        assert_eq!(rtcp, rtp + 1);
        assert!(rtp >= 47002);
    }

    #[test]
    fn test_find_port_pair_skips_occupied_rtcp() {
        let logger = create_test_logger();

        let _socket = UdpSocket::bind(("0.0.0.0", 48001)).unwrap();
        let (rtp, rtcp) = find_port_pair(48000, &logger).unwrap();

        assert!(rtp > 48000);
        assert_eq!(rtcp, rtp + 1);
    }

    #[test]
    fn test_range_near_max_port() {
        let logger = Logger::disabled();
        // Must not overflow
        let _ = find_available_port(u16::MAX - 10, &logger);
        let _ = find_port_pair(u16::MAX - 1, &logger);
    }
}
