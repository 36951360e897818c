//! # Client Connection Identity
//!
//! Each accepted socket gets a `ConnectionId` the moment it's accepted,
//! before AUTH completes. The teacher's UDP design tracked sequence
//! numbers, ack bitfields and an RTT estimate here for its reliability
//! layer; none of that has a counterpart once the transport is TCP, so
//! this module keeps only the identity.
//!
//! Idle-timeout enforcement (spec.md §9 Open Question 4) doesn't need a
//! separately-tracked last-activity timestamp: `server::handle_connection`
//! wraps each `read_frame` call in `tokio::time::timeout`, which already
//! measures exactly "no complete frame arrived within the window".

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a client connection, assigned at accept time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Hands out strictly-increasing `ConnectionId`s for the server's lifetime.
#[derive(Debug, Default)]
pub struct ConnectionIdAllocator {
    next: AtomicU64,
}

impl ConnectionIdAllocator {
    /// Allocates the next id. Safe to call from multiple accept tasks.
    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_hands_out_strictly_increasing_ids() {
        let alloc = ConnectionIdAllocator::default();
        let a = alloc.next();
        let b = alloc.next();
        let c = alloc.next();
        assert!(a.get() < b.get());
        assert!(b.get() < c.get());
    }

    #[test]
    fn ids_are_distinct_even_under_concurrent_allocation() {
        use std::sync::Arc;
        let alloc = Arc::new(ConnectionIdAllocator::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = alloc.clone();
                std::thread::spawn(move || (0..100).map(|_| alloc.next().get()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
    }
}
