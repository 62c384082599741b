//! Transport module - UDP sockets, packet pool and receiver

pub mod pool;
pub mod receiver;
pub mod rtcp_socket;
pub mod rtp_socket;
pub(crate) mod udp;

pub use pool::{PacketPool, PooledPacket};
pub use receiver::RtpReceiver;
pub use rtcp_socket::RtcpSocket;
pub use rtp_socket::{RtpSocket, SocketStats};
