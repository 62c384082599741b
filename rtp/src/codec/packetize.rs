//! State shared by every codec packetizer
//!
//! [`PacketizerCore`] owns the running RTP header fields (sequence number,
//! timestamp, SSRC) and the mechanics of claiming a buffer, stamping its
//! header and handing it to a [`PacketSink`]. Codec packetizers only decide
//! how to cut their payload.

use super::rtp::RtpHeader;
use crate::traits::PacketSink;
use crate::transport::pool::PooledPacket;
use logging::{LogLevel, Logger};
use rand::Rng;

/// Converts a presentation time in microseconds to RTP clock units.
///
/// Evaluated as `(ns / 100) * (clock / 1000) / 10000` in integer arithmetic,
/// so clocks that are not a multiple of 1 kHz are truncated (44100 Hz ticks
/// as 44000 Hz). The result wraps at 2^32 like the wire field.
pub fn rtp_timestamp(pts_us: u64, clock_frequency: u32) -> u32 {
    let nanos = pts_us.wrapping_mul(1000);
    ((nanos / 100).wrapping_mul(clock_frequency as u64 / 1000) / 10_000) as u32
}

/// Header state and packet plumbing of a packetizer.
pub struct PacketizerCore {
    payload_type: u8,
    ssrc: u32,
    /// Last sequence number written; pre-incremented per packet
    sequence_number: u16,
    clock_frequency: u32,
    timestamp: u32,
    dropped_packets: u64,
    logger: Logger,
}

impl PacketizerCore {
    /// Creates the core with a random initial sequence number.
    ///
    /// # Arguments
    /// * `payload_type` - RTP payload type (96-127 for dynamic mappings)
    /// * `clock_frequency` - RTP clock rate in Hz
    /// * `logger` - Logger, tagged `Packetizer`
    pub fn new(payload_type: u8, clock_frequency: u32, logger: &Logger) -> Self {
        let mut rng = rand::thread_rng();
        PacketizerCore {
            payload_type,
            ssrc: 0,
            sequence_number: rng.gen_range(0..=u16::MAX),
            clock_frequency,
            timestamp: 0,
            dropped_packets: 0,
            logger: logger.for_component("Packetizer"),
        }
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Forces the next packet to carry `sequence_number + 1`.
    pub fn set_sequence_number(&mut self, sequence_number: u16) {
        self.sequence_number = sequence_number;
    }

    pub fn clock_frequency(&self) -> u32 {
        self.clock_frequency
    }

    pub fn set_clock_frequency(&mut self, clock_frequency: u32) {
        self.clock_frequency = clock_frequency;
    }

    /// RTP timestamp stamped on the packets of the current chunk.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn dropped_packets(&self) -> u64 {
        self.dropped_packets
    }

    /// Payload bytes that fit in one packet of `sink`.
    pub fn max_payload(&self, sink: &dyn PacketSink) -> usize {
        sink.mtu().saturating_sub(RtpHeader::SIZE)
    }

    /// Sets the timestamp of the upcoming packets from a presentation time.
    pub fn update_timestamp(&mut self, pts_us: u64) -> u32 {
        self.timestamp = rtp_timestamp(pts_us, self.clock_frequency);
        self.timestamp
    }

    /// Claims a buffer from `sink`.
    ///
    /// On exhaustion the loss is logged and counted and `None` is returned;
    /// the caller drops the rest of its chunk.
    pub fn acquire(&mut self, sink: &dyn PacketSink) -> Option<PooledPacket> {
        self.ssrc = sink.ssrc();
        let packet = sink.acquire();
        if packet.is_none() {
            self.dropped_packets += 1;
            if self.logger.is_enabled(LogLevel::Warn) {
                self.logger.warn(&format!(
                    "Packet pool exhausted, dropping packet (seq {}, {} dropped so far)",
                    self.sequence_number.wrapping_add(1),
                    self.dropped_packets
                ));
            }
        }
        packet
    }

    /// Advances the sequence number and writes the fixed header into `packet`.
    pub fn write_rtp_header(&mut self, packet: &mut PooledPacket) -> bool {
        self.sequence_number = self.sequence_number.wrapping_add(1);

        let mut header = RtpHeader::new(self.payload_type, self.ssrc);
        header.sequence_number = self.sequence_number;
        header.timestamp = self.timestamp;

        match header.write_to(packet.buffer_mut()) {
            Ok(()) => true,
            Err(e) => {
                self.logger.error(&format!("Cannot write RTP header: {}", e));
                false
            }
        }
    }

    /// Claims a buffer and writes its header: the usual first step for each packet.
    pub fn next_packet(&mut self, sink: &dyn PacketSink) -> Option<PooledPacket> {
        let mut packet = self.acquire(sink)?;
        self.write_rtp_header(&mut packet).then_some(packet)
    }

    /// Finalizes `packet` (marker, total length, timestamp) and queues it on `sink`.
    pub fn write_next_packet(
        &mut self,
        sink: &dyn PacketSink,
        mut packet: PooledPacket,
        length: usize,
        marker: bool,
    ) {
        let buffer = packet.buffer_mut();
        if marker {
            buffer[1] |= 0x80;
        } else {
            buffer[1] &= 0x7F;
        }
        packet.set_length(length);
        packet.set_timestamp(self.timestamp);
        sink.send(packet);
    }

    /// Copies `payload` after the header and queues the packet.
    pub(crate) fn send_payload(
        &mut self,
        sink: &dyn PacketSink,
        mut packet: PooledPacket,
        payload: &[u8],
        marker: bool,
    ) {
        packet.payload_mut()[..payload.len()].copy_from_slice(payload);
        self.write_next_packet(sink, packet, RtpHeader::SIZE + payload.len(), marker);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory [`PacketSink`] collecting what packetizers emit.

    use crate::codec::rtp::RtpPacketView;
    use crate::traits::PacketSink;
    use crate::transport::pool::{PacketPool, PooledPacket};
    use logging::Logger;
    use std::sync::Mutex;

    pub(crate) struct CollectingSink {
        pool: PacketPool,
        ssrc: u32,
        pub(crate) sent: Mutex<Vec<(Vec<u8>, u32)>>,
    }

    impl CollectingSink {
        pub(crate) fn new(pool_size: usize, mtu: usize) -> Self {
            CollectingSink {
                pool: PacketPool::new(pool_size, mtu),
                ssrc: 0x1234_5678,
                sent: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn datagrams(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().iter().map(|(d, _)| d.clone()).collect()
        }

        pub(crate) fn timestamps(&self) -> Vec<u32> {
            self.sent.lock().unwrap().iter().map(|(_, ts)| *ts).collect()
        }

        pub(crate) fn with_views<F: FnMut(RtpPacketView<'_>)>(&self, mut f: F) {
            for datagram in self.datagrams() {
                f(RtpPacketView::parse(&datagram).unwrap());
            }
        }
    }

    impl PacketSink for CollectingSink {
        fn acquire(&self) -> Option<PooledPacket> {
            self.pool.acquire()
        }

        fn send(&self, packet: PooledPacket) {
            self.sent
                .lock()
                .unwrap()
                .push((packet.as_bytes().to_vec(), packet.timestamp()));
        }

        fn ssrc(&self) -> u32 {
            self.ssrc
        }

        fn mtu(&self) -> usize {
            self.pool.mtu()
        }
    }

    pub(crate) fn create_test_logger() -> Logger {
        Logger::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{CollectingSink, create_test_logger};
    use super::*;
    use crate::codec::rtp::RtpPacketView;

    #[test]
    fn test_rtp_timestamp_scaling() {
        assert_eq!(rtp_timestamp(0, 90_000), 0);
        assert_eq!(rtp_timestamp(1_000_000, 90_000), 90_000);
        assert_eq!(rtp_timestamp(33_333, 90_000), 2_999);
        assert_eq!(rtp_timestamp(1_000_000, 48_000), 48_000);
        // 44100 Hz truncates to 44 ticks per ms
        assert_eq!(rtp_timestamp(1_000_000, 44_100), 44_000);
    }

    #[test]
    fn test_update_timestamp() {
        let logger = create_test_logger();
        let mut core = PacketizerCore::new(96, 90_000, &logger);
        assert_eq!(core.update_timestamp(2_000_000), 180_000);
        assert_eq!(core.timestamp(), 180_000);
    }

    #[test]
    fn test_sequence_numbers_contiguous_across_wrap() {
        let logger = create_test_logger();
        let sink = CollectingSink::new(10, 100);
        let mut core = PacketizerCore::new(96, 90_000, &logger);
        core.set_sequence_number(65_533);

        for _ in 0..5 {
            let packet = core.next_packet(&sink).unwrap();
            core.send_payload(&sink, packet, &[1, 2, 3], false);
        }

        let mut seqs = Vec::new();
        sink.with_views(|view| seqs.push(view.header.sequence_number));
        assert_eq!(seqs, vec![65_534, 65_535, 0, 1, 2]);
    }

    #[test]
    fn test_header_fields_and_marker() {
        let logger = create_test_logger();
        let sink = CollectingSink::new(2, 100);
        let mut core = PacketizerCore::new(111, 48_000, &logger);
        core.update_timestamp(20_000);

        let packet = core.next_packet(&sink).unwrap();
        core.send_payload(&sink, packet, &[7; 10], true);

        let datagram = &sink.datagrams()[0];
        let view = RtpPacketView::parse(datagram).unwrap();
        assert_eq!(datagram.len(), 22);
        assert_eq!(view.header.payload_type, 111);
        assert_eq!(view.header.ssrc, 0x1234_5678);
        assert_eq!(view.header.timestamp, 960);
        assert!(view.header.marker);
        assert_eq!(view.payload, &[7; 10]);
        assert_eq!(sink.timestamps(), vec![960]);
    }

    #[test]
    fn test_exhaustion_is_counted() {
        let logger = create_test_logger();
        let sink = CollectingSink::new(1, 100);
        let mut core = PacketizerCore::new(96, 90_000, &logger);

        let held = core.acquire(&sink).unwrap();
        assert!(core.acquire(&sink).is_none());
        assert_eq!(core.dropped_packets(), 1);
        drop(held);
        assert!(core.acquire(&sink).is_some());
    }
}
