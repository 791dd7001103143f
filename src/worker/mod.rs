//! Worker subsystem.
//!
//! # Data Flow
//! ```text
//! Worker::init(arena)        Uninitialized → Initialized (arena warmed)
//! Worker::start(socket)      Initialized → Idle (read handle registered)
//!
//! Readiness event:
//!     Idle → ProcessingQuery
//!     → try_recv_from (never blocks)
//!     → drop if longer than max_datagram_size
//!     → query.rs (copy into arena, assign QueryId)
//!     → engine.resolve() behind catch_unwind
//!     → try_send_to answer / failure response / drop
//!     → arena.reset()
//!     ProcessingQuery → Idle
//!
//! Worker::stop()             Idle → Stopped (handle detached, socket returned)
//! Worker::deinit()           Stopped → Deinitialized (arena returned)
//! ```
//!
//! # Design Decisions
//! - The running task owns the worker core; stop() takes it back, so the arena can
//!   only be released after the task has finished
//! - Per-query failures are counted and logged, never returned to the reactor
//! - Datagrams are handled one per readiness wake-up, in arrival order

pub mod query;

use std::cell::Cell;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::config::{FailurePolicy, WorkerConfig};
use crate::engine::{Resolution, ResolutionEngine, ResolveError};
use crate::memory::{AllocationError, Arena};
use crate::net::ListenerSocket;
use crate::observability::metrics;
use crate::reactor::{HandleContext, Reactor, ReactorError, Registration};

pub use query::{Query, QueryId};

/// Pause after a failed readiness wait before polling the socket again.
const READINESS_BACKOFF: Duration = Duration::from_millis(100);

/// Worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    Initialized,
    /// Started and waiting for a datagram.
    Idle,
    /// Started and handling a datagram.
    ProcessingQuery,
    Stopped,
    Deinitialized,
}

/// Errors from worker lifecycle operations.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The arena cannot hold a single datagram.
    #[error("worker initialization failed: {0}")]
    Allocation(#[from] AllocationError),

    /// Lifecycle operation called out of order.
    #[error("cannot {op} worker in state {state:?}")]
    InvalidState {
        op: &'static str,
        state: WorkerState,
    },

    /// The worker's handle failed before handing its state back.
    #[error("worker detach failed: {0}")]
    Detach(#[from] ReactorError),
}

/// Why a query produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The datagram exceeded `max_datagram_size`.
    Oversized,
    /// The arena could not hold the query.
    Allocation,
    /// The engine rejected the payload.
    Malformed,
    /// The engine failed internally.
    EngineFailure,
    /// The engine panicked.
    EnginePanic,
    /// The response could not be written without blocking.
    SendFailed,
}

/// Result of processing one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered,
    FailureResponse,
    NoAnswer,
    Dropped(DropReason),
}

impl QueryOutcome {
    /// Metric label for this outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOutcome::Answered => "answered",
            QueryOutcome::FailureResponse => "failure_response",
            QueryOutcome::NoAnswer => "no_answer",
            QueryOutcome::Dropped(DropReason::Oversized) => "dropped_oversized",
            QueryOutcome::Dropped(DropReason::Allocation) => "dropped_allocation",
            QueryOutcome::Dropped(DropReason::Malformed) => "dropped_malformed",
            QueryOutcome::Dropped(DropReason::EngineFailure) => "dropped_engine_failure",
            QueryOutcome::Dropped(DropReason::EnginePanic) => "dropped_engine_panic",
            QueryOutcome::Dropped(DropReason::SendFailed) => "dropped_send_failed",
        }
    }
}

/// Per-worker counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStats {
    /// Datagrams read from the socket.
    pub received: u64,
    pub answered: u64,
    pub failure_responses: u64,
    /// Queries the engine consumed without producing a response.
    pub no_answer: u64,
    pub dropped_oversized: u64,
    pub dropped_allocation: u64,
    pub dropped_malformed: u64,
    pub dropped_engine_failure: u64,
    pub engine_panics: u64,
    pub send_failures: u64,
    /// Reads that failed with something other than would-block.
    pub receive_errors: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: QueryOutcome) {
        match outcome {
            QueryOutcome::Answered => self.answered += 1,
            QueryOutcome::FailureResponse => self.failure_responses += 1,
            QueryOutcome::NoAnswer => self.no_answer += 1,
            QueryOutcome::Dropped(DropReason::Oversized) => self.dropped_oversized += 1,
            QueryOutcome::Dropped(DropReason::Allocation) => self.dropped_allocation += 1,
            QueryOutcome::Dropped(DropReason::Malformed) => self.dropped_malformed += 1,
            QueryOutcome::Dropped(DropReason::EngineFailure) => self.dropped_engine_failure += 1,
            QueryOutcome::Dropped(DropReason::EnginePanic) => self.engine_panics += 1,
            QueryOutcome::Dropped(DropReason::SendFailed) => self.send_failures += 1,
        }
    }

    /// Queries that ended without any datagram being written.
    pub fn dropped(&self) -> u64 {
        self.dropped_oversized
            + self.dropped_allocation
            + self.dropped_malformed
            + self.dropped_engine_failure
            + self.engine_panics
            + self.send_failures
    }
}

/// Everything the worker owns. Moves into the read handle while started.
struct WorkerCore<E> {
    arena: Arena,
    engine: E,
    socket: Option<ListenerSocket>,
    /// One byte longer than `max_datagram_size` so oversized datagrams are detectable.
    recv_buf: Vec<u8>,
    max_datagram_size: usize,
    answer: Vec<u8>,
    failure_policy: FailurePolicy,
    stats: WorkerStats,
}

impl<E: ResolutionEngine> WorkerCore<E> {
    async fn serve(mut self, ctx: HandleContext, state: Rc<Cell<WorkerState>>) -> Self {
        let Some(listener) = self.socket.take() else {
            return self;
        };
        let socket = listener.socket();

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                ready = socket.readable() => {
                    if let Err(e) = ready {
                        self.stats.receive_errors += 1;
                        tracing::warn!(error = %e, backoff = ?READINESS_BACKOFF, "Socket readiness error");
                        if !back_off(&ctx).await {
                            break;
                        }
                        continue;
                    }

                    match socket.try_recv_from(&mut self.recv_buf) {
                        Ok((len, source)) => {
                            state.set(WorkerState::ProcessingQuery);
                            self.process(socket, len, source);
                            state.set(WorkerState::Idle);
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                        Err(e) => {
                            self.stats.receive_errors += 1;
                            tracing::debug!(error = %e, "Receive failed");
                        }
                    }
                }
            }
        }

        self.socket = Some(listener);
        self
    }

    fn process(&mut self, socket: &UdpSocket, len: usize, source: SocketAddr) -> QueryOutcome {
        let started = Instant::now();
        let id = QueryId::new();
        self.stats.received += 1;
        self.answer.clear();

        tracing::trace!(query = %id, source = %source, bytes = len, "Query received");

        let mut outcome = if len > self.max_datagram_size {
            tracing::debug!(
                query = %id,
                source = %source,
                bytes = len,
                limit = self.max_datagram_size,
                "Dropping query: datagram too large"
            );
            QueryOutcome::Dropped(DropReason::Oversized)
        } else {
            self.resolve(id, len, source)
        };
        if matches!(outcome, QueryOutcome::Answered | QueryOutcome::FailureResponse) {
            if let Err(e) = socket.try_send_to(&self.answer, source) {
                tracing::debug!(query = %id, destination = %source, error = %e, "Dropping response: send failed");
                outcome = QueryOutcome::Dropped(DropReason::SendFailed);
            }
        }

        self.arena.reset();
        self.stats.record(outcome);
        metrics::record_query(outcome.as_str(), len, started);

        tracing::trace!(query = %id, outcome = outcome.as_str(), "Query finished");
        outcome
    }

    fn resolve(&mut self, id: QueryId, len: usize, source: SocketAddr) -> QueryOutcome {
        let query = match Query::new_in(&self.arena, id, &self.recv_buf[..len], source) {
            Ok(query) => query,
            Err(e) => {
                tracing::debug!(query = %id, source = %source, error = %e, "Dropping query: arena exhausted");
                return QueryOutcome::Dropped(DropReason::Allocation);
            }
        };

        let engine = &mut self.engine;
        let answer = &mut self.answer;
        let result = panic::catch_unwind(AssertUnwindSafe(|| engine.resolve(&query, answer)));

        let reason = match result {
            Ok(Ok(Resolution::Answer)) if !answer.is_empty() => return QueryOutcome::Answered,
            Ok(Ok(_)) => {
                answer.clear();
                return QueryOutcome::NoAnswer;
            }
            Ok(Err(e)) => {
                tracing::debug!(query = %id, source = %source, error = %e, "Resolution failed");
                match e {
                    ResolveError::Malformed(_) => DropReason::Malformed,
                    ResolveError::Internal(_) => DropReason::EngineFailure,
                    ResolveError::Allocation(_) => DropReason::Allocation,
                }
            }
            Err(_) => {
                tracing::warn!(query = %id, source = %source, "Resolution engine panicked");
                DropReason::EnginePanic
            }
        };

        answer.clear();
        if self.failure_policy == FailurePolicy::Respond {
            let produced = panic::catch_unwind(AssertUnwindSafe(|| {
                engine.failure_response(&query, answer)
            }))
            .unwrap_or(false);
            if produced && !answer.is_empty() {
                return QueryOutcome::FailureResponse;
            }
            answer.clear();
        }

        QueryOutcome::Dropped(reason)
    }
}

/// Wait out [`READINESS_BACKOFF`]. Returns false if the handle was cancelled first.
async fn back_off(ctx: &HandleContext) -> bool {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => false,
        _ = tokio::time::sleep(READINESS_BACKOFF) => true,
    }
}

/// Turns socket readiness into engine invocations and responses.
pub struct Worker<E> {
    state: Rc<Cell<WorkerState>>,
    core: Option<WorkerCore<E>>,
    running: Option<Registration<WorkerCore<E>>>,
}

impl<E: ResolutionEngine + 'static> Worker<E> {
    /// Take ownership of `arena` and warm it for one maximum-size datagram.
    pub fn init(mut arena: Arena, engine: E, config: &WorkerConfig) -> Result<Self, WorkerError> {
        let state = Rc::new(Cell::new(WorkerState::Uninitialized));

        arena.acquire(config.max_datagram_size)?;
        arena.reset();
        state.set(WorkerState::Initialized);

        tracing::debug!(
            arena_bytes = arena.allocated_bytes(),
            arena_limit = arena.limit(),
            max_datagram_size = config.max_datagram_size,
            "Worker initialized"
        );

        Ok(Self {
            state,
            core: Some(WorkerCore {
                arena,
                engine,
                socket: None,
                recv_buf: vec![0u8; config.max_datagram_size + 1],
                max_datagram_size: config.max_datagram_size,
                answer: Vec::with_capacity(config.max_datagram_size),
                failure_policy: config.failure_policy,
                stats: WorkerStats::default(),
            }),
            running: None,
        })
    }

    /// Attach to `socket` and begin handling its readiness events.
    pub fn start(&mut self, reactor: &Reactor, socket: ListenerSocket) -> Result<(), WorkerError> {
        let state = self.state.get();
        let mut core = match (state, self.core.take()) {
            (WorkerState::Initialized, Some(core)) => core,
            (_, core) => {
                self.core = core;
                return Err(WorkerError::InvalidState { op: "start", state });
            }
        };

        let address = socket.local_addr();
        core.socket = Some(socket);

        let status = Rc::clone(&self.state);
        self.running = Some(reactor.register("worker", move |ctx| core.serve(ctx, status)));
        self.state.set(WorkerState::Idle);

        tracing::info!(address = %address, "Worker started");
        Ok(())
    }

    /// Detach from the reactor and hand the socket back.
    ///
    /// Returns only after the read handle has finished, so no query is in flight.
    pub fn stop(&mut self, reactor: &Reactor) -> Result<ListenerSocket, WorkerError> {
        let state = self.state.get();
        let Some(registration) = self.running.take() else {
            return Err(WorkerError::InvalidState { op: "stop", state });
        };

        reactor.deregister(registration.id());
        let result = reactor.complete(registration);
        self.state.set(WorkerState::Stopped);

        let mut core = result?;
        let socket = core.socket.take();
        let stats = core.stats;
        self.core = Some(core);

        tracing::info!(
            received = stats.received,
            answered = stats.answered,
            dropped = stats.dropped(),
            "Worker stopped"
        );

        socket.ok_or(WorkerError::InvalidState {
            op: "stop",
            state: WorkerState::Stopped,
        })
    }

    /// Release internal state and return the arena to its owner.
    pub fn deinit(&mut self) -> Result<Arena, WorkerError> {
        let state = self.state.get();
        let core = match (state, self.core.take()) {
            (WorkerState::Initialized | WorkerState::Stopped, Some(core)) => core,
            (_, core) => {
                self.core = core;
                return Err(WorkerError::InvalidState { op: "deinit", state });
            }
        };

        self.state.set(WorkerState::Deinitialized);
        tracing::debug!(stats = ?core.stats, "Worker deinitialized");
        Ok(core.arena)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Counters, available while the worker is not started.
    pub fn stats(&self) -> Option<WorkerStats> {
        self.core.as_ref().map(|core| core.stats)
    }
}

impl<E> std::fmt::Debug for Worker<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("state", &self.state.get())
            .field("started", &self.running.is_some())
            .finish()
    }
}
