//! Correlation id allocation for JSON-RPC requests.

use std::cell::Cell;

/// Issues strictly increasing correlation ids for outgoing JSON-RPC calls.
///
/// Ids are unique for the lifetime of the allocator and never reused.
/// Responses may arrive in any order, so every response is matched back to
/// its caller by id, never by position.
///
/// # Single-Threaded
///
/// Uses `Cell` internally: re-entrancy safe within one event loop, not
/// thread-safe. The allocator is owned by a client instance and passed by
/// reference, never stored in a global.
#[derive(Debug)]
pub struct RequestIdAllocator {
    next: Cell<u64>,
}

impl RequestIdAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self { next: Cell::new(1) }
    }

    /// Return the next id, strictly greater than every id returned before.
    pub fn next_id(&self) -> u64 {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing_and_distinct() {
        let ids = RequestIdAllocator::new();
        let mut seen = Vec::new();
        for _ in 0..1000 {
            seen.push(ids.next_id());
        }
        for pair in seen.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn first_id_is_one() {
        let ids = RequestIdAllocator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }
}
