//! Fixed pool of reusable packet buffers
//!
//! Buffers are claimed with [`PacketPool::acquire`] and returned when the
//! [`PooledPacket`] guard is dropped, usually by the sender thread once the
//! datagram has been handed to the socket. Acquisition never blocks: when
//! every buffer is in flight the caller gets `None` and decides what to drop.

use crate::codec::packet::RtpPacket;
use crate::utils::thread::lock;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One pool entry: the buffer and its in-use flag.
#[derive(Debug)]
pub(crate) struct PacketSlot {
    in_use: AtomicBool,
    packet: Mutex<Option<RtpPacket>>,
}

impl PacketSlot {
    fn new(capacity: usize) -> Self {
        PacketSlot {
            in_use: AtomicBool::new(false),
            packet: Mutex::new(Some(RtpPacket::new(capacity))),
        }
    }

    pub(crate) fn is_used(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// Atomically claims the slot; false if someone else holds it.
    pub(crate) fn try_consume(&self) -> bool {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.in_use.store(false, Ordering::Release);
    }
}

/// Pool of `size` packet buffers of `mtu` bytes each.
#[derive(Debug)]
pub struct PacketPool {
    slots: Vec<Arc<PacketSlot>>,
    mtu: usize,
}

impl PacketPool {
    pub fn new(size: usize, mtu: usize) -> Self {
        PacketPool {
            slots: (0..size).map(|_| Arc::new(PacketSlot::new(mtu))).collect(),
            mtu,
        }
    }

    /// Returns the first free buffer, or `None` if all are in use.
    pub fn acquire(&self) -> Option<PooledPacket> {
        self.slots
            .iter()
            .find(|slot| slot.try_consume())
            .map(|slot| {
                let mut packet =
                    lock(&slot.packet).take().unwrap_or_else(|| RtpPacket::new(self.mtu));
                packet.reset();
                PooledPacket {
                    packet,
                    slot: Arc::clone(slot),
                }
            })
    }

    /// Number of buffers currently handed out.
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_used()).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }
}

/// A claimed packet buffer; dropping it gives the buffer back to its pool.
#[derive(Debug)]
pub struct PooledPacket {
    packet: RtpPacket,
    slot: Arc<PacketSlot>,
}

impl Deref for PooledPacket {
    type Target = RtpPacket;

    fn deref(&self) -> &RtpPacket {
        &self.packet
    }
}

impl DerefMut for PooledPacket {
    fn deref_mut(&mut self) -> &mut RtpPacket {
        &mut self.packet
    }
}

impl Drop for PooledPacket {
    fn drop(&mut self) {
        // A zero-capacity placeholder does not allocate
        let packet = std::mem::replace(&mut self.packet, RtpPacket::new(0));
        *lock(&self.slot.packet) = Some(packet);
        self.slot.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_slot_consume_and_release() {
        let slot = PacketSlot::new(100);
        assert!(!slot.is_used());
        assert!(slot.try_consume());
        assert!(slot.is_used());
        assert!(!slot.try_consume());

        slot.release();
        assert!(!slot.is_used());
        assert!(slot.try_consume());
    }

    #[test]
    fn test_acquire_until_exhausted() {
        let pool = PacketPool::new(3, 1300);
        let held: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();

        assert_eq!(pool.in_use(), 3);
        assert!(pool.acquire().is_none());

        drop(held);
        assert_eq!(pool.in_use(), 0);
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn test_released_buffer_is_reused() {
        let pool = PacketPool::new(1, 64);
        {
            let mut packet = pool.acquire().unwrap();
            packet.buffer_mut()[0] = 0x80;
            packet.set_length(20);
            packet.set_timestamp(99);
        }

        let packet = pool.acquire().unwrap();
        assert_eq!(packet.capacity(), 64);
        assert_eq!(packet.buffer()[0], 0x80);
        assert_eq!(packet.length(), 0);
        assert_eq!(packet.timestamp(), 0);
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_capacity() {
        let pool = Arc::new(PacketPool::new(8, 100));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let a = pool.acquire();
                        let b = pool.acquire();
                        assert!(pool.in_use() <= pool.capacity());
                        drop(a);
                        drop(b);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_packet_released_from_other_thread() {
        let pool = PacketPool::new(1, 100);
        let packet = pool.acquire().unwrap();

        thread::spawn(move || drop(packet)).join().unwrap();
        assert_eq!(pool.in_use(), 0);
    }
}
