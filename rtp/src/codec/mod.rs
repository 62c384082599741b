//! Codec module - RTP/RTCP wire formats and packetizers

pub mod depacketize;
pub mod packet;
pub mod packetize;
pub mod packetizers;
pub mod rtcp;
pub mod rtp;

pub use depacketize::{Depacketizer, FrameListener};
pub use packet::RtpPacket;
pub use packetize::{PacketizerCore, rtp_timestamp};
pub use packetizers::aac::{AacRtpDepacketizer, AacRtpPacketizer};
pub use packetizers::h264::{H264RtpDepacketizer, H264RtpPacketizer};
pub use packetizers::opus::{OpusRtpDepacketizer, OpusRtpPacketizer};
pub use rtcp::{RtcpPacketType, SenderReport, SenderStats};
pub use rtp::{RtpHeader, RtpPacketView};
