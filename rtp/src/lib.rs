//! RTP Module - RTP/RTCP packetization and UDP transport
//!
//! Turns encoded media chunks into RTP packets sent over UDP, emits RTCP
//! Sender Reports as RTP traffic flows, and parses received RTP datagrams
//! back into payload chunks while tracking sequence continuity.

pub mod codec;
pub mod transport;

pub mod config;
pub mod error;
pub mod traits;
pub mod utils;

pub use codec::{
    AacRtpDepacketizer, AacRtpPacketizer, Depacketizer, FrameListener, H264RtpDepacketizer,
    H264RtpPacketizer, OpusRtpDepacketizer, OpusRtpPacketizer, PacketizerCore, RtpHeader,
    RtpPacket, RtpPacketView, SenderReport,
};
pub use config::{LoggingConfig, TransportConfig};
pub use error::{Result, RtpError};
pub use traits::{PacketSink, ReceiverListener, RtpDepacketizer, RtpPacketizer};
pub use transport::{PacketPool, PooledPacket, RtcpSocket, RtpReceiver, RtpSocket, SocketStats};
pub use utils::{find_available_port, find_port_pair, join_with_timeout};
