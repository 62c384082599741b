//! UDP socket setup shared by the RTP, RTCP and receiver sockets

use crate::config::TransportConfig;
use crate::error::Result;
use logging::{LogLevel, Logger};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr, UdpSocket};

/// Binds a UDP socket on `config.bind_address:port` (0 = ephemeral).
///
/// TTL applies to unicast and multicast datagrams. The TOS byte is best
/// effort: some platforms refuse it, which is only logged.
pub(crate) fn bind_udp(port: u16, config: &TransportConfig, logger: &Logger) -> Result<UdpSocket> {
    let address = SocketAddr::new(config.bind_address, port);
    let socket = Socket::new(Domain::for_address(address), Type::DGRAM, Some(Protocol::UDP))?;

    match config.bind_address {
        IpAddr::V4(_) => {
            socket.set_ttl(config.ttl)?;
            socket.set_multicast_ttl_v4(config.ttl)?;
            if let Err(e) = socket.set_tos(config.traffic_class) {
                logger.warn(&format!("Cannot set traffic class: {}", e));
            }
        }
        IpAddr::V6(_) => {
            socket.set_unicast_hops_v6(config.ttl)?;
            socket.set_multicast_hops_v6(config.ttl)?;
        }
    }

    socket.bind(&address.into())?;
    let socket: UdpSocket = socket.into();

    if logger.is_enabled(LogLevel::Debug) {
        logger.debug(&format!("UDP socket bound at {}", socket.local_addr()?));
    }
    Ok(socket)
}
