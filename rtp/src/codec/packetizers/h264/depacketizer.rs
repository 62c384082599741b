//! H.264 RTP Depacketizer Implementation
//!
//! Reconstructs H.264 NAL units from RTP packets according to RFC 6184.
//! Every returned unit carries a 4-byte Annex B start code.
//!
//! # Depacketization Modes
//!
//! ## Single NAL Unit Mode
//! Complete NAL units received in a single RTP packet are returned immediately.
//!
//! ## STAP-A Aggregation
//! Each aggregated unit (16-bit size + NAL unit) is returned separately.
//!
//! ## FU-A Fragmentation Mode
//! Fragmented NAL units are reassembled across multiple RTP packets:
//! 1. First fragment (S bit set): Initialize buffer with start code + NAL header
//! 2. Middle fragments: Append payload to buffer
//! 3. Last fragment (E bit set): Return complete NAL unit
//!
//! # Packet Loss Handling
//! - A sequence gap or a timestamp change discards a partially reassembled unit
//! - Fragments arriving without their start fragment are ignored
//! - Out-of-order packets are NOT reordered

use super::{FU_A_TYPE, NAL_START_CODE_4, STAP_A_TYPE};
use crate::codec::rtp::RtpPacketView;
use crate::traits::RtpDepacketizer;
use byteorder::{BigEndian, ByteOrder};

/// Represents an H.264 RTP depacketizer
pub struct H264RtpDepacketizer {
    /// Timestamp of the unit being reassembled
    current_timestamp: Option<u32>,
    /// Buffer for reassembling fragmented NAL units
    nal_buffer: Vec<u8>,
}

impl H264RtpDepacketizer {
    pub fn new() -> Self {
        H264RtpDepacketizer {
            current_timestamp: None,
            nal_buffer: Vec::new(),
        }
    }

    fn process_single_nal(&mut self, payload: &[u8]) -> Vec<u8> {
        with_start_code(payload)
    }

    fn process_stap_a(&mut self, payload: &[u8]) -> Vec<Vec<u8>> {
        let mut units = Vec::new();
        let mut offset = 1;

        while offset + 2 <= payload.len() {
            let size = BigEndian::read_u16(&payload[offset..offset + 2]) as usize;
            offset += 2;
            if size == 0 || offset + size > payload.len() {
                break;
            }
            units.push(with_start_code(&payload[offset..offset + size]));
            offset += size;
        }

        units
    }

    /// Process a FU-A fragmentation unit
    ///
    /// # FU-A Packet Structure
    /// ```text
    /// payload[0]: FU Indicator
    /// payload[1]: FU Header
    /// payload[2..]: Fragment data
    /// ```
    fn process_fu_a(&mut self, payload: &[u8], timestamp: u32) -> Option<Vec<u8>> {
        if payload.len() < 2 {
            return None;
        }

        let fu_indicator = payload[0];
        let (is_start, is_end, nal_type) = parse_fu_header(payload[1]);

        if is_start {
            self.start_new_fragment(timestamp, fu_indicator, nal_type);
        } else if self.nal_buffer.is_empty() {
            // Start fragment was lost
            return None;
        }

        self.nal_buffer.extend_from_slice(&payload[2..]);

        if is_end {
            self.current_timestamp = None;
            Some(std::mem::take(&mut self.nal_buffer))
        } else {
            None
        }
    }

    fn start_new_fragment(&mut self, timestamp: u32, fu_indicator: u8, nal_type: u8) {
        self.current_timestamp = Some(timestamp);
        self.nal_buffer.clear();
        self.nal_buffer.extend_from_slice(NAL_START_CODE_4);
        self.nal_buffer.push((fu_indicator & 0xE0) | nal_type);
    }
}

fn with_start_code(nal_unit: &[u8]) -> Vec<u8> {
    let mut complete_nal = Vec::with_capacity(NAL_START_CODE_4.len() + nal_unit.len());
    complete_nal.extend_from_slice(NAL_START_CODE_4);
    complete_nal.extend_from_slice(nal_unit);
    complete_nal
}

fn parse_fu_header(fu_header: u8) -> (bool, bool, u8) {
    let is_start = (fu_header & 0x80) != 0;
    let is_end = (fu_header & 0x40) != 0;
    let nal_type = fu_header & 0x1F;
    (is_start, is_end, nal_type)
}

impl RtpDepacketizer for H264RtpDepacketizer {
    fn depacketize(&mut self, packet: &RtpPacketView<'_>, in_sequence: bool) -> Vec<Vec<u8>> {
        let timestamp = packet.header.timestamp;
        let payload = packet.payload;

        if !self.nal_buffer.is_empty()
            && (!in_sequence || self.current_timestamp != Some(timestamp))
        {
            // Lost fragment or new frame: the partial unit can't be completed
            self.reset();
        }

        if payload.is_empty() {
            return Vec::new();
        }

        match payload[0] & 0x1F {
            FU_A_TYPE => self.process_fu_a(payload, timestamp).into_iter().collect(),
            STAP_A_TYPE => self.process_stap_a(payload),
            _ => vec![self.process_single_nal(payload)],
        }
    }

    fn reset(&mut self) {
        self.current_timestamp = None;
        self.nal_buffer.clear();
    }

    fn has_pending_data(&self) -> bool {
        !self.nal_buffer.is_empty()
    }
}

impl Default for H264RtpDepacketizer {
    fn default() -> Self {
        Self::new()
    }
}
