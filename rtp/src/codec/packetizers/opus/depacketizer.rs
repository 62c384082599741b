//! Opus RTP Depacketizer Implementation
//!
//! Implements RFC 7587 - RTP Payload Format for Opus Audio Codec.

use crate::codec::rtp::RtpPacketView;
use crate::traits::RtpDepacketizer;

/// Opus RTP depacketizer
///
/// The payload is the compressed audio frame itself; loss concealment is
/// left to the decoder.
#[derive(Debug, Default)]
pub struct OpusRtpDepacketizer;

impl OpusRtpDepacketizer {
    pub fn new() -> Self {
        OpusRtpDepacketizer
    }
}

impl RtpDepacketizer for OpusRtpDepacketizer {
    fn depacketize(&mut self, packet: &RtpPacketView<'_>, _in_sequence: bool) -> Vec<Vec<u8>> {
        if packet.payload.is_empty() {
            return Vec::new();
        }
        vec![packet.payload.to_vec()]
    }

    fn reset(&mut self) {}

    fn has_pending_data(&self) -> bool {
        false
    }
}
