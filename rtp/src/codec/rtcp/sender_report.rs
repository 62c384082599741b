//! RTCP Sender Report (RFC 3550 Section 6.4.1)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|    RC   |   PT=SR=200   |             length            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         SSRC of sender                        |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! |              NTP timestamp, most significant word             |
//! |             NTP timestamp, least significant word             |
//! |                         RTP timestamp                         |
//! |                     sender's packet count                     |
//! |                      sender's octet count                     |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! ```
//!
//! Reports are always sent without report blocks (RC = 0, length = 6).

use super::RtcpPacketType;
use super::stats::SenderStats;
use crate::error::{Result, RtpError};
use byteorder::{BigEndian, ByteOrder};
use std::sync::OnceLock;
use std::time::Instant;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanoseconds elapsed on a process-wide monotonic clock.
pub fn monotonic_nanos() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Splits a monotonic nanosecond reading into NTP (seconds, fraction) words.
pub fn ntp_from_monotonic(nanos: u64) -> (u32, u32) {
    let msw = nanos / NANOS_PER_SEC;
    let lsw = ((nanos - msw * NANOS_PER_SEC) << 32) / NANOS_PER_SEC;
    (msw as u32, lsw as u32)
}

/// RTCP Sender Report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    /// NTP timestamp (most significant 32 bits)
    pub ntp_timestamp_msw: u32,
    /// NTP timestamp (least significant 32 bits)
    pub ntp_timestamp_lsw: u32,
    /// RTP timestamp corresponding to NTP timestamp
    pub rtp_timestamp: u32,
    pub sender_packet_count: u32,
    pub sender_octet_count: u32,
}

impl SenderReport {
    /// Size of a report without report blocks.
    pub const SIZE: usize = 28;

    /// Builds a report from the running counters, stamped at `nanos`.
    pub fn new(stats: &SenderStats, rtp_timestamp: u32, nanos: u64) -> Self {
        let (msw, lsw) = ntp_from_monotonic(nanos);
        Self {
            ssrc: stats.ssrc,
            ntp_timestamp_msw: msw,
            ntp_timestamp_lsw: lsw,
            rtp_timestamp,
            sender_packet_count: stats.packet_count,
            sender_octet_count: stats.octet_count,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = 2 << 6;
        bytes[1] = RtcpPacketType::SR as u8;
        BigEndian::write_u16(&mut bytes[2..4], (Self::SIZE / 4 - 1) as u16);
        BigEndian::write_u32(&mut bytes[4..8], self.ssrc);
        BigEndian::write_u32(&mut bytes[8..12], self.ntp_timestamp_msw);
        BigEndian::write_u32(&mut bytes[12..16], self.ntp_timestamp_lsw);
        BigEndian::write_u32(&mut bytes[16..20], self.rtp_timestamp);
        BigEndian::write_u32(&mut bytes[20..24], self.sender_packet_count);
        BigEndian::write_u32(&mut bytes[24..28], self.sender_octet_count);
        bytes
    }

    /// Parse from bytes
    ///
    /// Trailing report blocks are skipped.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(RtpError::InvalidPacket(format!(
                "SR packet too short: {} bytes",
                data.len()
            )));
        }
        if data[0] >> 6 != 2 || data[1] != RtcpPacketType::SR as u8 {
            return Err(RtpError::InvalidPacket(format!(
                "not a version 2 sender report (type {})",
                data[1]
            )));
        }

        Ok(Self {
            ssrc: BigEndian::read_u32(&data[4..8]),
            ntp_timestamp_msw: BigEndian::read_u32(&data[8..12]),
            ntp_timestamp_lsw: BigEndian::read_u32(&data[12..16]),
            rtp_timestamp: BigEndian::read_u32(&data[16..20]),
            sender_packet_count: BigEndian::read_u32(&data[20..24]),
            sender_octet_count: BigEndian::read_u32(&data[24..28]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_report_bytes() {
        let mut stats = SenderStats::new(0x1234_5678);
        for _ in 0..5 {
            stats.update_sender(128, 90000);
        }

        let sr = SenderReport::new(&stats, 90000, 1_500_000_000);
        let bytes = sr.to_bytes();

        assert_eq!(&bytes[0..4], &[0x80, 200, 0x00, 0x06]);
        assert_eq!(&bytes[4..8], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 1]); // 1 s
        assert_eq!(&bytes[12..16], &[0x80, 0, 0, 0]); // 0.5 s
        assert_eq!(&bytes[16..20], &[0x00, 0x01, 0x5F, 0x90]); // 90000
        assert_eq!(&bytes[20..24], &[0, 0, 0, 5]);
        assert_eq!(&bytes[24..28], &[0, 0, 0x02, 0x80]); // 640
    }

    #[test]
    fn test_sender_report_parse() {
        let sr = SenderReport {
            ssrc: 42,
            ntp_timestamp_msw: 7,
            ntp_timestamp_lsw: 9,
            rtp_timestamp: 160000,
            sender_packet_count: 100,
            sender_octet_count: 50000,
        };

        let mut bytes = sr.to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 24]); // trailing report block
        assert_eq!(SenderReport::from_bytes(&bytes).unwrap(), sr);
    }

    #[test]
    fn test_sender_report_rejects_short() {
        assert!(SenderReport::from_bytes(&[0x80, 200, 0, 6]).is_err());
    }

    #[test]
    fn test_sender_report_rejects_other_type() {
        let mut bytes = SenderReport::new(&SenderStats::new(1), 0, 0).to_bytes();
        bytes[1] = RtcpPacketType::RR as u8;
        assert!(SenderReport::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_ntp_from_monotonic() {
        assert_eq!(ntp_from_monotonic(0), (0, 0));
        assert_eq!(ntp_from_monotonic(2_250_000_000), (2, 0x4000_0000));
        let (msw, lsw) = ntp_from_monotonic(999_999_999);
        assert_eq!(msw, 0);
        assert!(lsw > 0xFFFF_FF00);
    }

    #[test]
    fn test_monotonic_nanos_never_decreases() {
        let first = monotonic_nanos();
        let second = monotonic_nanos();
        assert!(second >= first);
    }
}
