//! RTP header serialization and datagram parsing
//!
//! This module implements RFC 3550 (RTP: A Transport Protocol for Real-Time Applications).
//!
//! # RTP Header Format (RFC 3550 Section 5.1)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           SSRC (Synchronization Source)                       |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! |            CSRC list (0 to 15 items, 32 bits each)            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! An optional header extension (profile id, length in 32-bit words, body)
//! follows the CSRC list, and the payload may be followed by padding whose
//! length is given by its last byte.
//!
//! # Example
//!
//! ```
//! use rtp::codec::rtp::{RtpHeader, RtpPacketView};
//!
//! let mut header = RtpHeader::new(96, 12345);
//! header.sequence_number = 100;
//! header.timestamp = 90000;
//! header.marker = true;
//!
//! let mut datagram = header.to_bytes().to_vec();
//! datagram.extend_from_slice(&[1, 2, 3]);
//!
//! let view = RtpPacketView::parse(&datagram).unwrap();
//! assert_eq!(view.header.sequence_number, 100);
//! assert_eq!(view.payload, &[1, 2, 3]);
//! ```

use crate::error::{Result, RtpError};
use byteorder::{BigEndian, ByteOrder};

/// RTP packet header according to RFC 3550 (fixed part only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    /// RTP version (always 2)
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    /// CSRC count (0-15)
    pub csrc_count: u8,
    /// Marker bit (frame boundary for most payload formats)
    pub marker: bool,
    /// Payload type (0-127)
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    /// Synchronization source identifier
    pub ssrc: u32,
}

impl RtpHeader {
    /// Fixed size of RTP header in bytes.
    pub const SIZE: usize = 12;
    /// The only RTP version in use.
    pub const VERSION: u8 = 2;

    /// Creates a new RTP header with default values.
    ///
    /// # Arguments
    /// * `payload_type` - RTP payload type (e.g., 96 for dynamic H.264)
    /// * `ssrc` - Synchronization source identifier
    pub fn new(payload_type: u8, ssrc: u32) -> Self {
        RtpHeader {
            version: Self::VERSION,
            padding: false,
            extension: false,
            csrc_count: 0,
            marker: false,
            payload_type,
            sequence_number: 0,
            timestamp: 0,
            ssrc,
        }
    }

    /// Writes the 12 header bytes at the start of `buf`.
    ///
    /// # Errors
    /// `InvalidPacket` if `buf` is shorter than [`RtpHeader::SIZE`].
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < Self::SIZE {
            return Err(RtpError::InvalidPacket(format!(
                "buffer of {} bytes cannot hold an RTP header",
                buf.len()
            )));
        }

        // Byte 0: V(2) + P(1) + X(1) + CC(4)
        buf[0] = ((self.version & 0b11) << 6)
            | ((self.padding as u8) << 5)
            | ((self.extension as u8) << 4)
            | (self.csrc_count & 0b1111);
        // Byte 1: M(1) + PT(7)
        buf[1] = ((self.marker as u8) << 7) | (self.payload_type & 0b0111_1111);
        BigEndian::write_u16(&mut buf[2..4], self.sequence_number);
        BigEndian::write_u32(&mut buf[4..8], self.timestamp);
        BigEndian::write_u32(&mut buf[8..12], self.ssrc);

        Ok(())
    }

    /// Serializes the fixed header.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        // The array is exactly SIZE bytes long, so this cannot fail
        let _ = self.write_to(&mut bytes);
        bytes
    }

    /// Deserializes the fixed header.
    ///
    /// Only the length is checked; see [`RtpPacketView::parse`] for full validation.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(RtpError::InvalidPacket(format!(
                "header too short: {} bytes",
                data.len()
            )));
        }

        Ok(RtpHeader {
            version: (data[0] >> 6) & 0b11,
            padding: (data[0] >> 5) & 0b1 == 1,
            extension: (data[0] >> 4) & 0b1 == 1,
            csrc_count: data[0] & 0b1111,
            marker: (data[1] >> 7) & 0b1 == 1,
            payload_type: data[1] & 0b0111_1111,
            sequence_number: BigEndian::read_u16(&data[2..4]),
            timestamp: BigEndian::read_u32(&data[4..8]),
            ssrc: BigEndian::read_u32(&data[8..12]),
        })
    }
}

/// RTP header extension (RFC 3550 Section 5.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderExtension<'a> {
    pub profile: u16,
    pub body: &'a [u8],
}

/// A received datagram split into its RTP parts, borrowing the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacketView<'a> {
    pub header: RtpHeader,
    csrc: &'a [u8],
    pub extension: Option<HeaderExtension<'a>>,
    /// Payload with padding removed
    pub payload: &'a [u8],
    /// Number of padding bytes stripped
    pub padding_len: usize,
}

impl<'a> RtpPacketView<'a> {
    /// Validates and splits an RTP datagram.
    ///
    /// # Errors
    /// `InvalidPacket` when the datagram is shorter than 12 bytes, is not
    /// version 2, is truncated inside the CSRC list or header extension, or
    /// declares more padding than there is payload.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = RtpHeader::from_bytes(data)?;
        if header.version != RtpHeader::VERSION {
            return Err(RtpError::InvalidPacket(format!(
                "unsupported RTP version {}",
                header.version
            )));
        }

        let mut offset = RtpHeader::SIZE;
        let csrc_len = 4 * header.csrc_count as usize;
        if data.len() < offset + csrc_len {
            return Err(RtpError::InvalidPacket(format!(
                "truncated CSRC list: {} CSRCs in {} bytes",
                header.csrc_count,
                data.len()
            )));
        }
        let csrc = &data[offset..offset + csrc_len];
        offset += csrc_len;

        let extension = if header.extension {
            let (extension, consumed) = parse_extension(&data[offset..])?;
            offset += consumed;
            Some(extension)
        } else {
            None
        };

        let mut end = data.len();
        let mut padding_len = 0;
        if header.padding {
            if end == offset {
                return Err(RtpError::InvalidPacket(
                    "padding flag set on empty payload".to_string(),
                ));
            }
            padding_len = data[end - 1] as usize;
            if padding_len > end - offset {
                return Err(RtpError::InvalidPacket(format!(
                    "padding of {} bytes exceeds payload of {} bytes",
                    padding_len,
                    end - offset
                )));
            }
            end -= padding_len;
        }

        Ok(RtpPacketView {
            header,
            csrc,
            extension,
            payload: &data[offset..end],
            padding_len,
        })
    }

    /// Contributing sources listed after the fixed header.
    pub fn csrc_list(&self) -> Vec<u32> {
        self.csrc.chunks_exact(4).map(BigEndian::read_u32).collect()
    }
}

fn parse_extension(data: &[u8]) -> Result<(HeaderExtension<'_>, usize)> {
    if data.len() < 4 {
        return Err(RtpError::InvalidPacket(
            "truncated header extension".to_string(),
        ));
    }
    let profile = BigEndian::read_u16(&data[0..2]);
    let body_len = 4 * BigEndian::read_u16(&data[2..4]) as usize;
    if data.len() < 4 + body_len {
        return Err(RtpError::InvalidPacket(format!(
            "header extension declares {} bytes, {} available",
            body_len,
            data.len() - 4
        )));
    }
    Ok((
        HeaderExtension {
            profile,
            body: &data[4..4 + body_len],
        },
        4 + body_len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtp_header_serialization() {
        let header = RtpHeader {
            version: 2,
            padding: false,
            extension: false,
            csrc_count: 0,
            marker: true,
            payload_type: 96,
            sequence_number: 1234,
            timestamp: 5678,
            ssrc: 9999,
        };

        let bytes = header.to_bytes();
        let decoded = RtpHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header, decoded);
    }

    #[test]
    fn test_rtp_header_wire_layout() {
        let mut header = RtpHeader::new(96, 0x1234_5678);
        header.sequence_number = 0xABCD;
        header.timestamp = 90000;
        header.marker = true;

        let bytes = header.to_bytes();
        assert_eq!(
            bytes,
            [0x80, 0xE0, 0xAB, 0xCD, 0x00, 0x01, 0x5F, 0x90, 0x12, 0x34, 0x56, 0x78]
        );
    }

    #[test]
    fn test_write_to_short_buffer() {
        let header = RtpHeader::new(96, 1);
        let mut buf = [0u8; 8];
        assert!(matches!(
            header.write_to(&mut buf),
            Err(RtpError::InvalidPacket(_))
        ));
    }

    #[test]
    fn test_rtp_header_from_bytes_short() {
        let short_data = vec![0x80, 0x60, 0x12, 0x34];
        let result = RtpHeader::from_bytes(&short_data);
        assert!(result.is_err());
    }

    #[test]
    fn test_rtp_header_payload_type() {
        let header = RtpHeader::new(127, 1000);
        let bytes = header.to_bytes();

        // Payload type is lower 7 bits of second byte
        assert_eq!(bytes[1] & 0x7F, 127);
        assert_eq!(bytes[1] >> 7, 0);
    }

    #[test]
    fn test_rtp_header_csrc_count() {
        let mut header = RtpHeader::new(96, 1000);
        header.csrc_count = 15; // Max value

        let bytes = header.to_bytes();
        let decoded = RtpHeader::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.csrc_count, 15);
    }

    #[test]
    fn test_parse_plain_packet() {
        let header = RtpHeader::new(96, 5555);
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[100, 101, 102]);

        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.header.ssrc, 5555);
        assert_eq!(view.payload, &[100, 101, 102]);
        assert!(view.extension.is_none());
        assert!(view.csrc_list().is_empty());
    }

    #[test]
    fn test_parse_empty_payload() {
        let data = RtpHeader::new(96, 1).to_bytes();
        let view = RtpPacketView::parse(&data).unwrap();
        assert!(view.payload.is_empty());
    }

    #[test]
    fn test_parse_skips_csrc_and_extension() {
        let mut header = RtpHeader::new(96, 1);
        header.csrc_count = 2;
        header.extension = true;

        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[0, 0, 0, 7, 0, 0, 0, 8]); // CSRCs
        data.extend_from_slice(&[0xBE, 0xDE, 0x00, 0x01]); // extension, 1 word
        data.extend_from_slice(&[1, 2, 3, 4]);
        data.extend_from_slice(&[0xAA, 0xBB]); // payload

        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.csrc_list(), vec![7, 8]);
        let extension = view.extension.unwrap();
        assert_eq!(extension.profile, 0xBEDE);
        assert_eq!(extension.body, &[1, 2, 3, 4]);
        assert_eq!(view.payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_parse_strips_padding() {
        let mut header = RtpHeader::new(96, 1);
        header.padding = true;

        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[9, 9, 9, 0, 0, 3]);

        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.payload, &[9, 9, 9]);
        assert_eq!(view.padding_len, 3);
    }

    #[test]
    fn test_parse_rejects_short_datagram() {
        let result = RtpPacketView::parse(&[0x80, 0x60, 0x00]);
        assert!(matches!(result, Err(RtpError::InvalidPacket(_))));
    }

    #[test]
    fn test_parse_rejects_wrong_version() {
        let mut data = RtpHeader::new(96, 1).to_bytes();
        data[0] = 0x40; // version 1
        assert!(RtpPacketView::parse(&data).is_err());
    }

    #[test]
    fn test_parse_rejects_truncated_csrc() {
        let mut header = RtpHeader::new(96, 1);
        header.csrc_count = 3;
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[0; 8]);

        assert!(RtpPacketView::parse(&data).is_err());
    }

    #[test]
    fn test_parse_rejects_truncated_extension() {
        let mut header = RtpHeader::new(96, 1);
        header.extension = true;
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[0xBE, 0xDE, 0x00, 0x02, 1, 2, 3, 4]);

        assert!(RtpPacketView::parse(&data).is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_padding() {
        let mut header = RtpHeader::new(96, 1);
        header.padding = true;
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[1, 2, 10]);

        assert!(RtpPacketView::parse(&data).is_err());
    }
}
