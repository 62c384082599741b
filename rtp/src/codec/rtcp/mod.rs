//! RTCP (RTP Control Protocol) Implementation
//!
//! Only the Sender Report is emitted; other packet types are recognized so
//! that incoming compound packets can be classified.

pub mod sender_report;
pub mod stats;

pub use sender_report::{SenderReport, monotonic_nanos, ntp_from_monotonic};
pub use stats::SenderStats;

/// RTCP packet types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcpPacketType {
    /// Sender Report (200)
    SR = 200,
    /// Receiver Report (201)
    RR = 201,
    /// Source Description (202)
    SDES = 202,
    /// Goodbye (203)
    BYE = 203,
    /// Application-defined (204)
    APP = 204,
}

impl RtcpPacketType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            200 => Some(RtcpPacketType::SR),
            201 => Some(RtcpPacketType::RR),
            202 => Some(RtcpPacketType::SDES),
            203 => Some(RtcpPacketType::BYE),
            204 => Some(RtcpPacketType::APP),
            _ => None,
        }
    }

    /// Type of the first packet in an RTCP datagram.
    pub fn of_datagram(data: &[u8]) -> Option<Self> {
        data.get(1).copied().and_then(Self::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_from_u8() {
        assert_eq!(RtcpPacketType::from_u8(200), Some(RtcpPacketType::SR));
        assert_eq!(RtcpPacketType::from_u8(203), Some(RtcpPacketType::BYE));
        assert_eq!(RtcpPacketType::from_u8(96), None);
    }

    #[test]
    fn test_packet_type_of_datagram() {
        assert_eq!(
            RtcpPacketType::of_datagram(&[0x81, 201, 0, 7]),
            Some(RtcpPacketType::RR)
        );
        assert_eq!(RtcpPacketType::of_datagram(&[0x80]), None);
    }
}
