//! Per-datagram query context.
//!
//! # Responsibilities
//! - Number each received datagram for log correlation
//! - Hold the datagram bytes and source address for the engine
//! - Tie the query's lifetime to the arena that backs it

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::memory::{AllocationError, Arena};

// Process-wide; starts at 1 so `q-0` never appears in logs.
static NEXT_QUERY: AtomicU64 = AtomicU64::new(1);

/// Sequence number of a received datagram, shown as `q-<n>` in query logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u64);

impl QueryId {
    /// Take the next number in the sequence.
    pub fn new() -> Self {
        Self(NEXT_QUERY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q-{}", self.0)
    }
}

/// A datagram being processed.
///
/// Borrows the worker's arena: it cannot outlive the arena, and the arena cannot be
/// reset or released while it exists.
#[derive(Debug)]
pub struct Query<'a> {
    id: QueryId,
    source: SocketAddr,
    payload: &'a [u8],
    received_at: Instant,
    arena: &'a Arena,
}

impl<'a> Query<'a> {
    /// Copy `payload` into `arena` and build a query around it.
    pub fn new_in(
        arena: &'a Arena,
        id: QueryId,
        payload: &[u8],
        source: SocketAddr,
    ) -> Result<Self, AllocationError> {
        let payload = arena.copy_slice(payload)?;
        Ok(Self {
            id,
            source,
            payload,
            received_at: Instant::now(),
            arena,
        })
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    /// Where the datagram came from, and where any answer goes.
    pub fn source(&self) -> SocketAddr {
        self.source
    }

    /// The raw datagram bytes.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// The arena backing this query, for engine scratch allocations.
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }
}
