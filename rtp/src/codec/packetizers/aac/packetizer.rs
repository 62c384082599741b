//! AAC RTP Packetizer Implementation
//!
//! One access unit per packet. An AU that does not fit is fragmented; every
//! fragment repeats the AU header with the size of the whole AU and only the
//! last one carries the marker bit. ADTS headers are stripped when present.

use super::{AU_HEADER_BITS, AU_HEADER_SECTION_SIZE, MAX_AU_SIZE, au_header};
use crate::codec::packetize::PacketizerCore;
use crate::codec::rtp::RtpHeader;
use crate::traits::{PacketSink, RtpPacketizer};
use byteorder::{BigEndian, ByteOrder};
use logging::{LogLevel, Logger};

/// Represents an AAC RTP packetizer
pub struct AacRtpPacketizer {
    core: PacketizerCore,
    logger: Logger,
}

impl AacRtpPacketizer {
    /// Create a new AAC RTP packetizer
    ///
    /// # Arguments
    /// * `payload_type` - RTP payload type (96-127 for dynamic mappings)
    /// * `sample_rate` - Audio sample rate, used as the RTP clock rate
    /// * `logger` - Logger
    pub fn new(payload_type: u8, sample_rate: u32, logger: &Logger) -> Self {
        AacRtpPacketizer {
            core: PacketizerCore::new(payload_type, sample_rate, logger),
            logger: logger.for_component("Packetizer"),
        }
    }

    fn send_fragment(
        &mut self,
        sink: &dyn PacketSink,
        au_size: usize,
        fragment: &[u8],
        marker: bool,
    ) -> bool {
        let Some(mut packet) = self.core.next_packet(sink) else {
            return false;
        };

        let payload = packet.payload_mut();
        BigEndian::write_u16(&mut payload[0..2], AU_HEADER_BITS);
        BigEndian::write_u16(&mut payload[2..4], au_header(au_size));
        payload[AU_HEADER_SECTION_SIZE..AU_HEADER_SECTION_SIZE + fragment.len()]
            .copy_from_slice(fragment);

        let length = RtpHeader::SIZE + AU_HEADER_SECTION_SIZE + fragment.len();
        self.core.write_next_packet(sink, packet, length, marker);
        true
    }
}

/// Returns the raw AU, skipping an ADTS header if the chunk starts with one.
pub(crate) fn strip_adts(data: &[u8]) -> &[u8] {
    if data.len() < 7 || data[0] != 0xFF || (data[1] & 0xF0) != 0xF0 {
        return data;
    }
    let protection_absent = data[1] & 0x01 != 0;
    let header_len = if protection_absent { 7 } else { 9 };
    data.get(header_len..).unwrap_or(&[])
}

impl RtpPacketizer for AacRtpPacketizer {
    fn write(&mut self, sink: &dyn PacketSink, payload: &[u8], pts_us: u64) -> usize {
        self.core.update_timestamp(pts_us);

        let access_unit = strip_adts(payload);
        if access_unit.is_empty() {
            return 0;
        }
        if access_unit.len() > MAX_AU_SIZE {
            if self.logger.is_enabled(LogLevel::Warn) {
                self.logger.warn(&format!(
                    "Dropping AAC access unit of {} bytes (max {})",
                    access_unit.len(),
                    MAX_AU_SIZE
                ));
            }
            return 0;
        }

        let room = self
            .core
            .max_payload(sink)
            .saturating_sub(AU_HEADER_SECTION_SIZE);
        if room == 0 {
            return 0;
        }

        let fragments: Vec<&[u8]> = access_unit.chunks(room).collect();
        let mut sent = 0;
        for (i, fragment) in fragments.iter().enumerate() {
            let is_last = i == fragments.len() - 1;
            if !self.send_fragment(sink, access_unit.len(), fragment, is_last) {
                break;
            }
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
