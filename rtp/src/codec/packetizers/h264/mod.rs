//! H.264 RTP Packetization (RFC 6184)
//!
//! This module implements RTP packetization and depacketization for H.264 video
//! according to RFC 6184 specification.

mod depacketizer;
mod packetizer;

pub use depacketizer::H264RtpDepacketizer;
pub use packetizer::{H264_CLOCK_RATE, H264RtpPacketizer};

/// STAP-A aggregation packet type (RFC 6184 Section 5.7.1)
const STAP_A_TYPE: u8 = 24;
/// FU-A fragmentation unit type (RFC 6184 Section 5.8)
const FU_A_TYPE: u8 = 28;
/// H.264 NAL unit start codes (Annex B format)
const NAL_START_CODE_4: &[u8] = &[0x00, 0x00, 0x00, 0x01];
const NAL_START_CODE_3: &[u8] = &[0x00, 0x00, 0x01];
