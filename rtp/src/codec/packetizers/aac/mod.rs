//! AAC RTP packetization module (RFC 3640, AAC-hbr mode)
//!
//! ```text
//! +---------------------+------------------+------------------+
//! | AU-headers-length   | AU-header(s)     | AU data          |
//! | (16 bits, in bits)  | size:13 | idx:3  |                  |
//! +---------------------+------------------+------------------+
//! ```

mod depacketizer;
mod packetizer;

pub use depacketizer::AacRtpDepacketizer;
pub use packetizer::AacRtpPacketizer;

/// AU-headers-length field plus one AU header
const AU_HEADER_SECTION_SIZE: usize = 4;

/// Bits of one AU header in AAC-hbr mode
const AU_HEADER_BITS: u16 = 16;

/// Largest AU size expressible by the 13-bit size field
const MAX_AU_SIZE: usize = 0x1FFF;

/// Builds an AU header carrying `size` with AU-index 0.
fn au_header(size: usize) -> u16 {
    ((size as u16) & 0x1FFF) << 3
}
