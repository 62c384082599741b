//! Sender-side RTCP counters

/// Counters carried in Sender Reports.
///
/// Both counts wrap at 2^32 like their wire fields and are never reset
/// during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Our SSRC
    pub ssrc: u32,
    pub packet_count: u32,
    /// Payload octets sent (RTP headers excluded)
    pub octet_count: u32,
    pub last_rtp_timestamp: u32,
    /// Sender Reports emitted so far
    pub reports_sent: u64,
}

impl SenderStats {
    pub fn new(ssrc: u32) -> Self {
        Self {
            ssrc,
            ..Self::default()
        }
    }

    /// Accounts for one RTP packet handed to the network.
    pub fn update_sender(&mut self, payload_length: usize, rtp_timestamp: u32) {
        self.packet_count = self.packet_count.wrapping_add(1);
        self.octet_count = self.octet_count.wrapping_add(payload_length as u32);
        self.last_rtp_timestamp = rtp_timestamp;
    }
}
