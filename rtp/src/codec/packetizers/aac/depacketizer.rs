//! AAC RTP Depacketizer Implementation
//!
//! Parses the AU header section of RFC 3640 AAC-hbr packets. A packet may
//! carry several complete AUs, or one fragment of a larger AU; fragments are
//! collected until the packet with the marker bit.

use super::AU_HEADER_BITS;
use crate::codec::rtp::RtpPacketView;
use crate::traits::RtpDepacketizer;
use byteorder::{BigEndian, ByteOrder};

/// Represents an AAC RTP depacketizer
#[derive(Debug, Default)]
pub struct AacRtpDepacketizer {
    /// Size announced by the AU header of the fragmented AU
    expected_size: usize,
    fragment: Vec<u8>,
}

impl AacRtpDepacketizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn continue_fragment(&mut self, au_size: usize, data: &[u8], marker: bool) -> Vec<Vec<u8>> {
        if self.fragment.is_empty() {
            self.expected_size = au_size;
        } else if au_size != self.expected_size {
            // Header of a different AU: the previous one can't be completed
            self.reset();
            self.expected_size = au_size;
        }

        self.fragment.extend_from_slice(data);

        if !marker {
            return Vec::new();
        }

        let complete = std::mem::take(&mut self.fragment);
        let expected = std::mem::take(&mut self.expected_size);
        if complete.len() == expected {
            vec![complete]
        } else {
            Vec::new()
        }
    }
}

/// Reads the AU sizes of the header section; returns them and the header section length.
fn parse_au_headers(payload: &[u8]) -> Option<(Vec<usize>, usize)> {
    if payload.len() < 2 {
        return None;
    }
    let headers_bits = BigEndian::read_u16(&payload[0..2]);
    let section_len = 2 + (headers_bits as usize).div_ceil(8);
    if section_len > payload.len() {
        return None;
    }

    let sizes = payload[2..section_len]
        .chunks_exact((AU_HEADER_BITS / 8) as usize)
        .map(|header| (BigEndian::read_u16(header) >> 3) as usize)
        .collect();
    Some((sizes, section_len))
}

impl RtpDepacketizer for AacRtpDepacketizer {
    fn depacketize(&mut self, packet: &RtpPacketView<'_>, in_sequence: bool) -> Vec<Vec<u8>> {
        if !in_sequence && self.has_pending_data() {
            self.reset();
        }

        let Some((sizes, section_len)) = parse_au_headers(packet.payload) else {
            return Vec::new();
        };
        let data = &packet.payload[section_len..];

        let is_fragment = sizes.len() == 1 && sizes[0] != data.len();
        if is_fragment || self.has_pending_data() {
            return match sizes.first() {
                Some(&au_size) => self.continue_fragment(au_size, data, packet.header.marker),
                None => Vec::new(),
            };
        }

        let mut units = Vec::with_capacity(sizes.len());
        let mut offset = 0;
        for size in sizes {
            if size == 0 || offset + size > data.len() {
                break;
            }
            units.push(data[offset..offset + size].to_vec());
            offset += size;
        }
        units
    }

    fn reset(&mut self) {
        self.expected_size = 0;
        self.fragment.clear();
    }

    fn has_pending_data(&self) -> bool {
        !self.fragment.is_empty()
    }
}
