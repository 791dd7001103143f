//! Memory subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Arena::with_limit(config.arena_limit_bytes)
//!     → moved into the Worker (sole owner)
//!
//! Per datagram:
//!     Worker copies payload into the arena → Query borrows it
//!     → engine may acquire scratch space from the same arena
//!     → Query dropped → arena.reset()
//!
//! Teardown:
//!     Worker::deinit() hands the arena back → arena.release()
//! ```
//!
//! # Design Decisions
//! - Bump allocation: no per-allocation system calls on the hot path
//! - Allocations borrow the arena, so reset/release cannot race a live Query
//! - Exhaustion is an ordinary error, never a process abort

pub mod arena;

pub use arena::{AllocationError, Arena, ArenaStats};
