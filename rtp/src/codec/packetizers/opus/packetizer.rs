//! Opus RTP Packetizer Implementation
//!
//! Implements RFC 7587 - RTP Payload Format for Opus Audio Codec.
//!
//! Opus packets typically fit within a single RTP packet, so fragmentation
//! is rarely needed.

use crate::codec::packetize::PacketizerCore;
use crate::traits::{PacketSink, RtpPacketizer};
use logging::Logger;

/// Opus always uses a 48 kHz RTP clock (RFC 7587 Section 4.1)
pub const OPUS_CLOCK_RATE: u32 = 48_000;

/// Opus RTP packetizer
///
/// One encoded frame per packet; the marker bit is never set.
pub struct OpusRtpPacketizer {
    core: PacketizerCore,
}

impl OpusRtpPacketizer {
    /// Create a new Opus RTP packetizer
    ///
    /// # Arguments
    /// * `payload_type` - RTP payload type (typically 111 for Opus)
    /// * `logger` - Logger
    pub fn new(payload_type: u8, logger: &Logger) -> Self {
        OpusRtpPacketizer {
            core: PacketizerCore::new(payload_type, OPUS_CLOCK_RATE, logger),
        }
    }
}

impl RtpPacketizer for OpusRtpPacketizer {
    fn write(&mut self, sink: &dyn PacketSink, payload: &[u8], pts_us: u64) -> usize {
        self.core.update_timestamp(pts_us);

        let max_payload = self.core.max_payload(sink);
        if max_payload == 0 {
            return 0;
        }

        // Split into multiple packets only if the frame exceeds the MTU (rare for Opus)
        let mut sent = 0;
        for chunk in payload.chunks(max_payload) {
            let Some(packet) = self.core.next_packet(sink) else {
                break;
            };
            self.core.send_payload(sink, packet, chunk, false);
            sent += 1;
        }
        sent
    }

    fn core(&self) -> &PacketizerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PacketizerCore {
        &mut self.core
    }
}
