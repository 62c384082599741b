//! Seams between packetizers, sockets and receivers.

use crate::codec::packetize::PacketizerCore;
use crate::codec::rtp::RtpPacketView;
use crate::error::RtpError;
use crate::transport::pool::PooledPacket;

/// Destination of packetizer output, implemented by [`RtpSocket`](crate::RtpSocket).
pub trait PacketSink: Send + Sync {
    /// Claims a free packet buffer, `None` when all of them are in flight.
    fn acquire(&self) -> Option<PooledPacket>;

    /// Queues a filled packet for sending. Never blocks.
    fn send(&self, packet: PooledPacket);

    /// SSRC stamped on every packet of this sink.
    fn ssrc(&self) -> u32;

    /// Size of each packet buffer, RTP header included.
    fn mtu(&self) -> usize;
}

/// Codec-specific RTP packetizer.
///
/// An instance is driven from a single thread.
pub trait RtpPacketizer {
    /// Packetizes one encoded chunk presented at `pts_us` microseconds.
    ///
    /// Returns the number of packets handed to `sink`. If the sink runs out
    /// of buffers the remainder of the chunk is dropped.
    fn write(&mut self, sink: &dyn PacketSink, payload: &[u8], pts_us: u64) -> usize;

    fn core(&self) -> &PacketizerCore;

    fn core_mut(&mut self) -> &mut PacketizerCore;

    fn get_payload_type(&self) -> u8 {
        self.core().payload_type()
    }

    fn get_ssrc(&self) -> u32 {
        self.core().ssrc()
    }

    fn get_timestamp(&self) -> u32 {
        self.core().timestamp()
    }

    fn get_sequence_number(&self) -> u16 {
        self.core().sequence_number()
    }

    /// Packets lost to pool exhaustion so far.
    fn dropped_packets(&self) -> u64 {
        self.core().dropped_packets()
    }
}

/// Codec-specific payload reassembly.
pub trait RtpDepacketizer: Send {
    /// Consumes one packet and returns the frames it completed.
    ///
    /// `in_sequence` is false when the packet does not directly follow the
    /// previous one; partially reassembled data should then be discarded.
    fn depacketize(&mut self, packet: &RtpPacketView<'_>, in_sequence: bool) -> Vec<Vec<u8>>;

    /// Drops any partially reassembled data.
    fn reset(&mut self);

    fn has_pending_data(&self) -> bool;
}

/// Callbacks of [`RtpReceiver`](crate::RtpReceiver), invoked on its listener threads.
pub trait ReceiverListener: Send + Sync {
    fn on_rtp_received(&self, data: &[u8]);

    fn on_rtcp_received(&self, _data: &[u8]) {}

    fn on_error(&self, _error: &RtpError) {}
}
