//! H.264 RTP Packetizer Implementation
//!
//! Implements RFC 6184 - RTP Payload Format for H.264 Video.
//!
//! # Packetization Modes
//! This implementation supports two packetization modes:
//!
//! ## Single NAL Unit Mode (Section 5.6)
//! Used when a complete NAL unit fits within the packet. The NAL unit is sent
//! as-is in the RTP payload without modification.
//!
//! ## FU-A Fragmentation Mode (Section 5.8)
//! Used when a NAL unit exceeds the packet and must be fragmented. Each
//! fragment carries a FU indicator and FU header for reassembly.
//!
//! ```text
//! FU Indicator            FU Header
//!  0 1 2 3 4 5 6 7         0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+       +-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   |       |S|E|R|  Type   |
//! +-+-+-+-+-+-+-+-+       +-+-+-+-+-+-+-+-+
//! ```
//! - F/NRI: copied from the NAL header, Type 28 for FU-A
//! - S/E: first/last fragment, Type: original NAL unit type
//!
//! The marker bit is set on the last packet of the access unit.

use super::{FU_A_TYPE, NAL_START_CODE_3, NAL_START_CODE_4};
use crate::codec::packetize::PacketizerCore;
use crate::codec::rtp::RtpHeader;
use crate::traits::{PacketSink, RtpPacketizer};
use logging::Logger;

/// RTP clock rate for video (RFC 6184 Section 8.2.1)
pub const H264_CLOCK_RATE: u32 = 90_000;

/// Represents an H.264 RTP packetizer
///
/// Handles both Single NAL Unit and FU-A Fragmentation modes.
pub struct H264RtpPacketizer {
    core: PacketizerCore,
}

impl H264RtpPacketizer {
    /// Create a new H.264 RTP packetizer
    ///
    /// # Arguments
    /// * `payload_type` - RTP payload type (96-127 for dynamic mappings)
    /// * `logger` - Logger
    pub fn new(payload_type: u8, logger: &Logger) -> Self {
        H264RtpPacketizer {
            core: PacketizerCore::new(payload_type, H264_CLOCK_RATE, logger),
        }
    }

    /// Sends a NAL unit that fits in one packet.
    ///
    /// Returns false if no buffer was available.
    fn packetize_single_nal(
        &mut self,
        sink: &dyn PacketSink,
        nal_unit: &[u8],
        is_last: bool,
    ) -> bool {
        let Some(packet) = self.core.next_packet(sink) else {
            return false;
        };
        self.core.send_payload(sink, packet, nal_unit, is_last);
        true
    }

    /// Splits a NAL unit into FU-A fragments.
    ///
    /// Returns the number of packets sent and whether the whole unit went out.
    fn packetize_fu_a(
        &mut self,
        sink: &dyn PacketSink,
        nal_unit: &[u8],
        is_last_nal: bool,
        max_payload: usize,
    ) -> (usize, bool) {
        if max_payload <= 2 {
            return (0, false);
        }

        let (nal_type, nri_bits) = parse_nal_header(nal_unit[0]);
        let fu_indicator = nri_bits | FU_A_TYPE;
        let fragment_size = max_payload - 2;
        let fragments: Vec<&[u8]> = nal_unit[1..].chunks(fragment_size).collect();

        let mut sent = 0;
        for (i, fragment) in fragments.iter().enumerate() {
            let Some(mut packet) = self.core.next_packet(sink) else {
                return (sent, false);
            };

            let is_last_fragment = i == fragments.len() - 1;
            let payload = packet.payload_mut();
            payload[0] = fu_indicator;
            payload[1] = build_fu_header(nal_type, i == 0, is_last_fragment);
            payload[2..2 + fragment.len()].copy_from_slice(fragment);

            let length = RtpHeader::SIZE + 2 + fragment.len();
            self.core
                .write_next_packet(sink, packet, length, is_last_nal && is_last_fragment);
            sent += 1;
        }
        (sent, true)
    }
}

/// Extract NAL units from H.264 Annex B byte stream
///
/// Searches for NAL unit start codes (0x000001 or 0x00000001). If no start
/// codes are found, treats the entire input as a single NAL unit.
pub(crate) fn extract_nal_units(data: &[u8]) -> Vec<&[u8]> {
    let mut nal_units = Vec::new();
    let mut start: Option<usize> = None;

    let mut i = 0;
    while i < data.len() {
        let code_len = if data[i..].starts_with(NAL_START_CODE_4) {
            NAL_START_CODE_4.len()
        } else if data[i..].starts_with(NAL_START_CODE_3) {
            NAL_START_CODE_3.len()
        } else {
            i += 1;
            continue;
        };

        if let Some(begin) = start {
            nal_units.push(&data[begin..i]);
        }
        start = Some(i + code_len);
        i += code_len;
    }

    match start {
        Some(begin) => nal_units.push(&data[begin..]),
        None => nal_units.push(data),
    }

    nal_units.retain(|nal| !nal.is_empty());
    nal_units
}

/// Returns (type, F+NRI bits in place).
fn parse_nal_header(nal_header: u8) -> (u8, u8) {
    (nal_header & 0x1F, nal_header & 0xE0)
}

fn build_fu_header(nal_type: u8, is_first: bool, is_last: bool) -> u8 {
    let mut fu_header = nal_type;
    if is_first {
        fu_header |= 0x80;
    }
    if is_last {
        fu_header |= 0x40;
    }
    fu_header
}

impl RtpPacketizer for H264RtpPacketizer {
    fn write(&mut self, sink: &dyn PacketSink, payload: &[u8], pts_us: u64) -> usize {
        self.core.update_timestamp(pts_us);

        let nal_units = extract_nal_units(payload);
        let max_payload = self.core.max_payload(sink);
        let mut sent = 0;

        for (i, nal_unit) in nal_units.iter().enumerate() {
            let is_last_nal = i == nal_units.len() - 1;

            if nal_unit.len() <= max_payload {
                if !self.packetize_single_nal(sink, nal_unit, is_last_nal) {
                    break;
                }
                sent += 1;
            } else {
                let (count, complete) =
                    self.packetize_fu_a(sink, nal_unit, is_last_nal, max_payload);
                sent += count;
                if !complete {
                    break;
                }
            }
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
