//! Opus RTP packetization module (RFC 7587)

mod depacketizer;
mod packetizer;

pub use depacketizer::OpusRtpDepacketizer;
pub use packetizer::{OPUS_CLOCK_RATE, OpusRtpPacketizer};
