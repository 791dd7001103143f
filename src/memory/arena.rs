//! Bounded bump arena for per-worker and per-query allocations.

use bumpalo::Bump;
use thiserror::Error;

/// The arena could not satisfy an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("arena exhausted: requested {requested} bytes (limit {limit} bytes)")]
pub struct AllocationError {
    /// Size of the failed request in bytes.
    pub requested: usize,
    /// Configured arena limit in bytes.
    pub limit: usize,
}

/// Counters reported when an arena is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    /// Bytes held by the arena's chunks at release time.
    pub allocated_bytes: usize,
    /// Number of times the arena was recycled.
    pub resets: u64,
}

/// A bump allocator with a hard upper bound.
///
/// Every allocation borrows the arena, so nothing handed out by [`Arena::acquire`]
/// can be used after [`Arena::reset`] or [`Arena::release`]; the borrow checker
/// rejects it.
#[derive(Debug)]
pub struct Arena {
    bump: Bump,
    limit: usize,
    resets: u64,
}

impl Arena {
    /// Create an arena that never holds more than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        let bump = Bump::new();
        bump.set_allocation_limit(Some(limit));
        Self {
            bump,
            limit,
            resets: 0,
        }
    }

    /// Whether a fresh arena limited to `limit` bytes can serve one `size`-byte
    /// allocation. Chunk bookkeeping counts against the limit, so `limit == size`
    /// is usually not enough.
    pub fn can_hold(limit: usize, size: usize) -> bool {
        Self::with_limit(limit).acquire(size).is_ok()
    }

    /// Allocate `size` zeroed bytes.
    pub fn acquire(&self, size: usize) -> Result<&mut [u8], AllocationError> {
        self.bump
            .try_alloc_slice_fill_copy(size, 0u8)
            .map_err(|_| self.exhausted(size))
    }

    /// Copy `bytes` into the arena.
    pub fn copy_slice(&self, bytes: &[u8]) -> Result<&mut [u8], AllocationError> {
        self.bump
            .try_alloc_slice_copy(bytes)
            .map_err(|_| self.exhausted(bytes.len()))
    }

    /// Move `value` into the arena.
    pub fn alloc<T>(&self, value: T) -> Result<&mut T, AllocationError> {
        self.bump
            .try_alloc(value)
            .map_err(|_| self.exhausted(std::mem::size_of::<T>()))
    }

    /// Invalidate every allocation and recycle the memory.
    ///
    /// Keeps the largest chunk, so a warmed arena serves the next query without
    /// touching the system allocator.
    pub fn reset(&mut self) {
        self.bump.reset();
        self.resets += 1;
    }

    /// Bytes currently held by the arena's chunks.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Configured upper bound in bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Release the arena and all memory it holds.
    pub fn release(self) -> ArenaStats {
        let stats = ArenaStats {
            allocated_bytes: self.bump.allocated_bytes(),
            resets: self.resets,
        };
        tracing::debug!(
            allocated_bytes = stats.allocated_bytes,
            resets = stats.resets,
            "Arena released"
        );
        stats
    }

    fn exhausted(&self, requested: usize) -> AllocationError {
        AllocationError {
            requested,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_within_limit() {
        let arena = Arena::with_limit(64 * 1024);
        let buf = arena.acquire(512).unwrap();
        assert_eq!(buf.len(), 512);
        assert!(buf.iter().all(|b| *b == 0));
        assert!(arena.allocated_bytes() >= 512);
    }

    #[test]
    fn acquire_over_limit_fails() {
        let arena = Arena::with_limit(4 * 1024);
        let err = arena.acquire(1024 * 1024).unwrap_err();
        assert_eq!(err.requested, 1024 * 1024);
        assert_eq!(err.limit, 4 * 1024);
    }

    #[test]
    fn can_hold_matches_first_acquire() {
        for limit in [65_535, 65_535 + 64, 70 * 1024, 128 * 1024] {
            let fits = Arena::with_limit(limit).acquire(65_535).is_ok();
            assert_eq!(Arena::can_hold(limit, 65_535), fits, "limit {}", limit);
        }
        assert!(Arena::can_hold(128 * 1024, 65_535));
        assert!(!Arena::can_hold(1024, 4096));
    }

    #[test]
    fn copy_and_alloc() {
        let arena = Arena::with_limit(64 * 1024);
        let bytes = arena.copy_slice(b"hello").unwrap();
        assert_eq!(bytes, b"hello");

        let value = arena.alloc(42u64).unwrap();
        *value += 1;
        assert_eq!(*value, 43);
    }

    #[test]
    fn reset_recycles_memory() {
        let mut arena = Arena::with_limit(256 * 1024);
        arena.acquire(8 * 1024).unwrap();
        let warmed = arena.allocated_bytes();

        for _ in 0..100 {
            arena.reset();
            arena.acquire(8 * 1024).unwrap();
        }

        assert_eq!(arena.allocated_bytes(), warmed);
        let stats = arena.release();
        assert_eq!(stats.resets, 100);
    }

    #[test]
    fn exhausted_arena_recovers_after_reset() {
        let mut arena = Arena::with_limit(32 * 1024);
        arena.acquire(16 * 1024).unwrap();
        assert!(arena.acquire(64 * 1024).is_err());

        arena.reset();
        assert!(arena.acquire(16 * 1024).is_ok());
    }
}
