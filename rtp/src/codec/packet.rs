//! Fixed-capacity RTP packet buffer

use super::rtp::RtpHeader;

/// A reusable packet buffer.
///
/// The buffer always holds `capacity` bytes; `length` marks how many of them
/// form the datagram (header included). Packets live in a
/// [`PacketPool`](crate::transport::PacketPool) and are recycled after sending.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    buffer: Vec<u8>,
    length: usize,
    timestamp: u32,
}

impl RtpPacket {
    /// Creates a zeroed buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        RtpPacket {
            buffer: vec![0u8; capacity],
            length: 0,
            timestamp: 0,
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Bytes that go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Sets the logical length, clamped to the capacity.
    pub fn set_length(&mut self, length: usize) {
        self.length = length.min(self.buffer.len());
    }

    /// Payload bytes of the logical packet (everything after the fixed header).
    pub fn payload_length(&self) -> usize {
        self.length.saturating_sub(RtpHeader::SIZE)
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Room left for payload after the fixed header.
    pub fn max_payload(&self) -> usize {
        self.capacity().saturating_sub(RtpHeader::SIZE)
    }

    /// Mutable view of the payload area.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let start = RtpHeader::SIZE.min(self.buffer.len());
        &mut self.buffer[start..]
    }

    pub(crate) fn reset(&mut self) {
        self.length = 0;
        self.timestamp = 0;
    }
}
