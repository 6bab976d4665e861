//! Packet pool - reuse of packet allocations across exchanges.
//!
//! # Design
//!
//! A last-in-first-out free list behind one mutex:
//! - The lock covers only the list push or pop
//! - Settings and caller-supplied resolvers run after the lock is
//!   released, so user code never executes under it
//! - Released packets are cleared first, so an acquired packet is always
//!   in the unset state while header string capacity is retained
//! - The list is unbounded; it grows to the high-water mark of
//!   simultaneously released packets
//!
//! # Example
//!
//! ```
//! use packwire::protocol::{acquire, release};
//! use packwire::PacketSetting;
//!
//! let mut packet = acquire(None, [PacketSetting::BodyCodec("json".into())])?;
//! packet.header_mut().seq = 1;
//! let header = packet.encode_header();
//! release(packet);
//! # assert!(!header.is_empty());
//! # Ok::<(), packwire::PackwireError>(())
//! ```

use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::packet::{BodyResolver, Packet, PacketSetting};

/// A LIFO free list of packets guarded by a single mutex.
pub struct PacketPool {
    free: Mutex<Vec<Packet>>,
}

static GLOBAL_POOL: PacketPool = PacketPool::new();

impl PacketPool {
    /// Creates an empty pool.
    #[inline]
    pub const fn new() -> PacketPool {
        PacketPool {
            free: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide pool used by the module-level [`acquire`] and
    /// [`release`] functions.
    #[inline]
    pub fn global() -> &'static PacketPool {
        &GLOBAL_POOL
    }

    /// Pops the most recently released packet, or allocates one if the
    /// pool is empty, then resets it with `resolver` and `settings`.
    ///
    /// A failing setting puts the instance back into the pool and
    /// propagates the error.
    pub fn acquire<S>(&self, resolver: Option<BodyResolver>, settings: S) -> Result<Packet>
    where
        S: IntoIterator<Item = PacketSetting>,
    {
        let reused = self.free.lock().pop();
        let mut packet = match reused {
            Some(packet) => packet,
            None => {
                tracing::trace!("packet pool empty, allocating");
                Packet::new()
            }
        };
        if let Err(err) = packet.reset(resolver, settings) {
            self.release(packet);
            return Err(err);
        }
        Ok(packet)
    }

    /// Clears `packet` and pushes it onto the free list.
    ///
    /// The body is dropped here so large payloads are not retained
    /// across reuse.
    pub fn release(&self, mut packet: Packet) {
        packet.clear();
        self.free.lock().push(packet);
    }

    /// Number of packets currently waiting in the pool.
    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    /// True when no released packet is waiting.
    pub fn is_empty(&self) -> bool {
        self.free.lock().is_empty()
    }
}

impl Default for PacketPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Acquires a packet from the process-wide pool.
pub fn acquire<S>(resolver: Option<BodyResolver>, settings: S) -> Result<Packet>
where
    S: IntoIterator<Item = PacketSetting>,
{
    GLOBAL_POOL.acquire(resolver, settings)
}

/// Returns a packet to the process-wide pool.
pub fn release(packet: Packet) {
    GLOBAL_POOL.release(packet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JSON_CODEC_ID;
    use crate::error::PackwireError;
    use serde_json::json;

    #[test]
    fn test_acquire_from_empty_pool_allocates() {
        let pool = PacketPool::new();
        assert!(pool.is_empty());

        let packet = pool.acquire(None, []).unwrap();
        assert!(packet.header().is_empty());
        assert_eq!(packet.body_codec(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_release_then_acquire_reuses() {
        let pool = PacketPool::new();
        let packet = pool.acquire(None, []).unwrap();
        pool.release(packet);
        assert_eq!(pool.len(), 1);

        let _packet = pool.acquire(None, []).unwrap();
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_acquire_pops_most_recent_release() {
        let pool = PacketPool::new();
        let mut first = pool.acquire(None, []).unwrap();
        first.header_mut().uri = "x".repeat(64);
        let second = pool.acquire(None, []).unwrap();

        pool.release(first);
        pool.release(second);

        // `second` never touched its uri, so its retained capacity is 0;
        // `first` keeps the 64-byte allocation through release.
        let top = pool.acquire(None, []).unwrap();
        assert_eq!(top.header().uri.capacity(), 0);
        let next = pool.acquire(None, []).unwrap();
        assert!(next.header().uri.capacity() >= 64);
    }

    #[test]
    fn test_release_clears_packet_state() {
        let pool = PacketPool::new();
        let mut packet = pool.acquire(None, []).unwrap();
        packet
            .apply([
                PacketSetting::BodyCodec("json".into()),
                PacketSetting::BodyGzip(6),
            ])
            .unwrap();
        packet.header_mut().seq = 42;
        packet.header_mut().uri = "/work".to_string();
        packet.set_body(Box::new(json!({"payload": [1, 2, 3]})));
        packet.encode_header();
        packet.encode_body().unwrap();
        assert_eq!(packet.body_codec(), JSON_CODEC_ID);

        pool.release(packet);
        let packet = pool.acquire(None, []).unwrap();
        assert!(packet.header().is_empty());
        assert_eq!(packet.header().gzip_level, 0);
        assert_eq!(packet.body_codec(), 0);
        assert!(packet.body().is_none());
        assert_eq!(packet.length(), 0);
    }

    #[test]
    fn test_header_capacity_survives_reuse() {
        let pool = PacketPool::new();
        let mut packet = pool.acquire(None, []).unwrap();
        packet.header_mut().uri = "y".repeat(128);
        pool.release(packet);

        let packet = pool.acquire(None, []).unwrap();
        assert!(packet.header().uri.is_empty());
        assert!(packet.header().uri.capacity() >= 128);
    }

    #[test]
    fn test_failed_setting_returns_packet_to_pool() {
        let pool = PacketPool::new();
        let err = pool
            .acquire(None, [PacketSetting::BodyCodec("protobuf".into())])
            .unwrap_err();
        assert!(matches!(err, PackwireError::CodecNotFound(_)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_pool_grows_to_high_water_mark() {
        let pool = PacketPool::new();
        let packets: Vec<Packet> = (0..64)
            .map(|_| pool.acquire(None, []).unwrap())
            .collect();
        for packet in packets {
            pool.release(packet);
        }
        assert_eq!(pool.len(), 64);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = PacketPool::new();
        std::thread::scope(|scope| {
            for worker in 0u64..8 {
                let pool = &pool;
                scope.spawn(move || {
                    for round in 0..100 {
                        let mut packet = pool.acquire(None, []).unwrap();
                        assert!(packet.header().is_empty());
                        packet.header_mut().seq = worker * 1000 + round + 1;
                        let encoded = packet.encode_header();
                        assert!(!encoded.is_empty());
                        pool.release(packet);
                    }
                });
            }
        });
        // Each worker holds at most one packet at a time.
        assert!(pool.len() <= 8);
        assert!(pool.len() >= 1);
    }

    #[test]
    fn test_global_pool_cycle() {
        let mut packet = acquire(None, [PacketSetting::BodyCodec("raw".into())]).unwrap();
        packet.header_mut().seq = 9;
        packet.set_body(Box::new(vec![1u8, 2, 3]));
        let body = packet.encode_body().unwrap();
        assert_eq!(&body[..], &[1, 2, 3]);
        release(packet);

        // Whatever instance comes back, it is in the unset state.
        let packet = acquire(None, []).unwrap();
        assert!(packet.header().is_empty());
        assert!(packet.body().is_none());
        release(packet);
    }
}
