//! Receive-side driver shared by every codec depacketizer
//!
//! [`Depacketizer`] parses datagrams, tracks sequence continuity, lets the
//! codec-specific [`RtpDepacketizer`] reassemble frames and posts each
//! completed frame to a [`FrameListener`] with its presentation time in
//! milliseconds.
//!
//! # Examples
//! ```
//! use logging::Logger;
//! use rtp::{Depacketizer, OpusRtpDepacketizer, RtpHeader};
//!
//! let mut depacketizer = Depacketizer::new(OpusRtpDepacketizer::new(), 48_000, &Logger::disabled());
//! depacketizer.set_listener(|frame: &[u8], pts_ms: u64| {
//!     println!("{} bytes at {} ms", frame.len(), pts_ms);
//! });
//!
//! let mut datagram = RtpHeader::new(111, 1).to_bytes().to_vec();
//! datagram.extend_from_slice(&[0xFC, 0x01]);
//! depacketizer.write(&datagram).unwrap();
//! ```

use super::rtp::{RtpHeader, RtpPacketView};
use crate::error::{Result, RtpError};
use crate::traits::{ReceiverListener, RtpDepacketizer};
use crate::utils::thread::lock;
use logging::{LogLevel, Logger};
use std::sync::Mutex;

/// Consumer of reassembled frames.
pub trait FrameListener: Send {
    fn on_frame(&mut self, data: &[u8], pts_ms: u64);
}

impl<F> FrameListener for F
where
    F: FnMut(&[u8], u64) + Send,
{
    fn on_frame(&mut self, data: &[u8], pts_ms: u64) {
        self(data, pts_ms)
    }
}

/// Codec-independent depacketization state.
pub struct Depacketizer<D> {
    codec: D,
    clock_frequency: u32,
    previous_sequence: Option<u16>,
    lost_events: u64,
    listener: Option<Box<dyn FrameListener>>,
    logger: Logger,
}

impl<D: RtpDepacketizer> Depacketizer<D> {
    pub fn new(codec: D, clock_frequency: u32, logger: &Logger) -> Self {
        Depacketizer {
            codec,
            clock_frequency,
            previous_sequence: None,
            lost_events: 0,
            listener: None,
            logger: logger.for_component("Depacketizer"),
        }
    }

    pub fn set_listener<L: FrameListener + 'static>(&mut self, listener: L) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clock_frequency(&self) -> u32 {
        self.clock_frequency
    }

    pub fn set_clock_frequency(&mut self, clock_frequency: u32) {
        self.clock_frequency = clock_frequency;
    }

    /// Number of discontinuities seen so far.
    pub fn lost_events(&self) -> u64 {
        self.lost_events
    }

    pub fn codec(&self) -> &D {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut D {
        &mut self.codec
    }

    /// Processes one received datagram.
    ///
    /// # Errors
    /// `InvalidPacket` if the datagram is not a well-formed RTP packet; the
    /// sequence state is left untouched in that case.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let packet = RtpPacketView::parse(data)?;
        let in_sequence = self.check_sequence_number(packet.header.sequence_number);

        for frame in self.codec.depacketize(&packet, in_sequence) {
            self.post_data(&frame, packet.header.timestamp);
        }
        Ok(())
    }

    /// Records `seq` and tells whether it directly follows the previous one.
    ///
    /// The first packet is always in sequence. Gaps and reordering are
    /// logged and counted but the packet is still processed.
    pub fn check_sequence_number(&mut self, seq: u16) -> bool {
        let in_sequence = match self.previous_sequence {
            None => true,
            Some(previous) => seq == previous.wrapping_add(1),
        };

        if !in_sequence {
            self.lost_events += 1;
            if self.logger.is_enabled(LogLevel::Debug) {
                self.logger.debug(&format!(
                    "Sequence discontinuity: expected {}, got {}",
                    self.previous_sequence.unwrap_or(0).wrapping_add(1),
                    seq
                ));
            }
        }

        self.previous_sequence = Some(seq);
        in_sequence
    }

    /// Whether `header` closes a frame.
    pub fn is_next_packet(&self, header: &RtpHeader) -> bool {
        header.marker
    }

    /// Delivers a frame, converting its RTP timestamp to milliseconds.
    pub fn post_data(&mut self, payload: &[u8], rtp_timestamp: u32) {
        let pts_ms = (rtp_timestamp as u64 * 1000)
            .checked_div(self.clock_frequency as u64)
            .unwrap_or(0);

        if let Some(listener) = self.listener.as_mut() {
            listener.on_frame(payload, pts_ms);
        }
    }

    /// Forgets sequence history and any partial frame.
    pub fn reset(&mut self) {
        self.previous_sequence = None;
        self.codec.reset();
    }
}

impl<D: RtpDepacketizer> ReceiverListener for Mutex<Depacketizer<D>> {
    fn on_rtp_received(&self, data: &[u8]) {
        let mut depacketizer = lock(self);
        if let Err(e) = depacketizer.write(data) {
            depacketizer
                .logger
                .debug(&format!("Dropping datagram: {}", e));
        }
    }

    fn on_error(&self, error: &RtpError) {
        lock(self)
            .logger
            .warn(&format!("Receiver error: {}", error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::packetizers::OpusRtpDepacketizer;
    use std::sync::Arc;

    fn datagram(seq: u16, timestamp: u32, payload: &[u8]) -> Vec<u8> {
        let mut header = RtpHeader::new(111, 1);
        header.sequence_number = seq;
        header.timestamp = timestamp;
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(payload);
        data
    }

    fn collecting(
        clock: u32,
    ) -> (
        Depacketizer<OpusRtpDepacketizer>,
        Arc<Mutex<Vec<(Vec<u8>, u64)>>>,
    ) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);
        let mut depacketizer =
            Depacketizer::new(OpusRtpDepacketizer::new(), clock, &Logger::disabled());
        depacketizer.set_listener(move |data: &[u8], pts: u64| {
            sink.lock().unwrap().push((data.to_vec(), pts));
        });
        (depacketizer, frames)
    }

    #[test]
    fn test_check_sequence_number() {
        let (mut depacketizer, _) = collecting(48_000);

        assert!(depacketizer.check_sequence_number(10));
        assert!(depacketizer.check_sequence_number(11));
        assert!(!depacketizer.check_sequence_number(13));
        assert!(depacketizer.check_sequence_number(14));
        assert!(!depacketizer.check_sequence_number(12));
        assert_eq!(depacketizer.lost_events(), 2);
    }

    #[test]
    fn test_check_sequence_number_wraps() {
        let (mut depacketizer, _) = collecting(48_000);

        assert!(depacketizer.check_sequence_number(65_535));
        assert!(depacketizer.check_sequence_number(0));
        assert_eq!(depacketizer.lost_events(), 0);
    }

    #[test]
    fn test_write_posts_frames_with_millis() {
        let (mut depacketizer, frames) = collecting(48_000);

        depacketizer.write(&datagram(1, 48_000, &[1, 2])).unwrap();
        depacketizer.write(&datagram(2, 96_960, &[3])).unwrap();

        let frames = frames.lock().unwrap();
        assert_eq!(frames[0], (vec![1, 2], 1000));
        assert_eq!(frames[1], (vec![3], 2020));
    }

    #[test]
    fn test_gap_still_delivers() {
        let (mut depacketizer, frames) = collecting(48_000);

        depacketizer.write(&datagram(1, 0, &[1])).unwrap();
        depacketizer.write(&datagram(5, 960, &[2])).unwrap();

        assert_eq!(frames.lock().unwrap().len(), 2);
        assert_eq!(depacketizer.lost_events(), 1);
    }

    #[test]
    fn test_invalid_datagram_rejected() {
        let (mut depacketizer, frames) = collecting(48_000);

        assert!(matches!(
            depacketizer.write(&[0x80, 0x6F]),
            Err(RtpError::InvalidPacket(_))
        ));
        assert!(frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_post_data_large_timestamp() {
        let (mut depacketizer, frames) = collecting(90_000);

        depacketizer.post_data(&[0], u32::MAX);
        assert_eq!(frames.lock().unwrap()[0].1, u32::MAX as u64 * 1000 / 90_000);
    }

    #[test]
    fn test_post_data_zero_clock() {
        let (mut depacketizer, frames) = collecting(0);

        depacketizer.post_data(&[0], 1234);
        assert_eq!(frames.lock().unwrap()[0].1, 0);
    }

    #[test]
    fn test_is_next_packet() {
        let (depacketizer, _) = collecting(48_000);
        let mut header = RtpHeader::new(111, 1);
        assert!(!depacketizer.is_next_packet(&header));
        header.marker = true;
        assert!(depacketizer.is_next_packet(&header));
    }

    #[test]
    fn test_receiver_listener_impl() {
        let (depacketizer, frames) = collecting(48_000);
        let shared = Mutex::new(depacketizer);

        shared.on_rtp_received(&datagram(7, 480, &[9, 9]));
        shared.on_rtp_received(&[0x00]);

        assert_eq!(frames.lock().unwrap().as_slice(), &[(vec![9, 9], 10)]);
    }
}
