//! RTP Packetizers for different codecs
//!
//! This module contains codec-specific RTP packetizer implementations.
//! Each codec follows its respective RFC specification for RTP payload format.
pub mod aac;
pub mod h264;
pub mod opus;

pub use aac::{AacRtpDepacketizer, AacRtpPacketizer};
pub use h264::{H264RtpDepacketizer, H264RtpPacketizer};
pub use opus::{OpusRtpDepacketizer, OpusRtpPacketizer};
