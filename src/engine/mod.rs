//! Resolution engine seam.
//!
//! # Data Flow
//! ```text
//! Worker (per datagram)
//!     → ResolutionEngine::resolve(&Query, &mut answer)
//!         Ok(Answer)   → answer bytes sent to the query's source
//!         Ok(NoAnswer) → nothing sent
//!         Err(_)       → failure policy: drop, or failure_response()
//! ```
//!
//! # Design Decisions
//! - The engine is opaque to the core; payloads are bytes plus a source address
//! - Engines run on the reactor thread and must never block
//! - Errors are per query; the worker contains them

pub mod notimpl;

use thiserror::Error;

use crate::memory::AllocationError;
use crate::worker::Query;

pub use notimpl::NotImplementedEngine;

/// What the engine produced for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The answer buffer holds a response datagram.
    Answer,
    /// The query is consumed without a response.
    NoAnswer,
}

/// The engine failed on a single query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The payload could not be interpreted.
    #[error("malformed query: {0}")]
    Malformed(String),

    /// The engine failed internally.
    #[error("engine failure: {0}")]
    Internal(String),

    /// Scratch space for this query did not fit in the arena.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// The component that turns query bytes into response bytes.
pub trait ResolutionEngine {
    /// Resolve `query`, writing any response datagram into `answer` (empty on entry).
    fn resolve(&mut self, query: &Query<'_>, answer: &mut Vec<u8>)
        -> Result<Resolution, ResolveError>;

    /// Write a generic failure response for a query that failed to resolve.
    ///
    /// Returns false when no response can be produced (the query is then dropped).
    fn failure_response(&mut self, _query: &Query<'_>, _answer: &mut Vec<u8>) -> bool {
        false
    }
}
