//! Single-threaded event loop.
//!
//! # Data Flow
//! ```text
//! Reactor::new()
//!     → current-thread tokio runtime (I/O + timer drivers) + LocalSet
//!
//! register(name, task)
//!     → child token of the stop token → entry in the handle table
//!     → task spawned on the LocalSet (never leaves this thread)
//!
//! run()
//!     Created → Running → (stop token cancelled) → Stopping → Stopped
//!
//! complete(registration)
//!     → drive the LocalSet until a detached handle hands its state back
//! ```
//!
//! # Design Decisions
//! - One reactor per process; it is `!Send`, handles are `!Send` futures
//! - The stop token is the only cancellation primitive; it ends the run loop,
//!   never a callback that is already executing
//! - Handles observe stop through child tokens, so teardown can reclaim their state

pub mod handle;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use thiserror::Error;
use tokio::runtime::{EnterGuard, Runtime};
use tokio::task::LocalSet;

use crate::lifecycle::Shutdown;
use handle::HandleTable;

pub use handle::{HandleContext, HandleId, Registration};

/// Reactor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    /// Constructed, accepting registrations, not yet dispatching.
    Created,
    /// Dispatching readiness events.
    Running,
    /// Stop observed; the current wait cycle is returning.
    Stopping,
    /// `run()` has returned.
    Stopped,
}

/// Errors raised by the reactor itself.
#[derive(Debug, Error)]
pub enum ReactorError {
    /// The runtime could not be built.
    #[error("failed to build reactor runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// `run()` was called outside the `Created` state.
    #[error("reactor cannot run from state {state:?}")]
    AlreadyRun { state: ReactorState },

    /// A handle's task panicked or was aborted before returning.
    #[error("handle {name} failed: {reason}")]
    HandleFailed { name: &'static str, reason: String },
}

/// The process's event loop.
pub struct Reactor {
    // Declared before `runtime` so handle tasks drop while the drivers still exist.
    local: LocalSet,
    runtime: Runtime,
    shutdown: Shutdown,
    handles: Rc<RefCell<HandleTable>>,
    state: Rc<Cell<ReactorState>>,
}

impl Reactor {
    /// Build a reactor on the calling thread.
    pub fn new() -> Result<Self, ReactorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ReactorError::Runtime)?;

        Ok(Self {
            local: LocalSet::new(),
            runtime,
            shutdown: Shutdown::new(),
            handles: Rc::new(RefCell::new(HandleTable::default())),
            state: Rc::new(Cell::new(ReactorState::Created)),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReactorState {
        self.state.get()
    }

    /// The reactor's stop token. Clones may be triggered from any thread.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Request the run loop to return after the current dispatch cycle.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Enter the runtime context, e.g. to register sockets or signal streams.
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }

    /// Register a handle whose task is built from its [`HandleContext`].
    pub fn register<F, Fut, T>(&self, name: &'static str, task: F) -> Registration<T>
    where
        F: FnOnce(HandleContext) -> Fut,
        Fut: Future<Output = T> + 'static,
        T: 'static,
    {
        let token = self.shutdown.token().child_token();
        let id = self.handles.borrow_mut().insert(name, token.clone());
        let ctx = HandleContext::new(
            id,
            name,
            token,
            self.shutdown.clone(),
            Rc::downgrade(&self.handles),
        );

        let join = self.local.spawn_local(task(ctx));
        tracing::debug!(handle = %id, name, "Handle registered");

        Registration { id, name, join }
    }

    /// Deregister a handle, cancelling its token. Returns false if it was not registered.
    pub fn deregister(&self, id: HandleId) -> bool {
        match self.handles.borrow_mut().remove(id) {
            Some(name) => {
                tracing::debug!(handle = %id, name, "Handle deregistered");
                true
            }
            None => false,
        }
    }

    /// Whether `id` is still in the registration table.
    pub fn is_registered(&self, id: HandleId) -> bool {
        self.handles.borrow().contains(id)
    }

    /// Number of registered handles.
    pub fn handle_count(&self) -> usize {
        self.handles.borrow().len()
    }

    /// Dispatch until the stop token is cancelled.
    pub fn run(&self) -> Result<(), ReactorError> {
        let state = self.state.get();
        if state != ReactorState::Created {
            return Err(ReactorError::AlreadyRun { state });
        }

        self.state.set(ReactorState::Running);
        tracing::info!(handles = self.handle_count(), "Reactor running");

        let shutdown = self.shutdown.clone();
        let state = Rc::clone(&self.state);
        self.local.block_on(&self.runtime, async move {
            shutdown.cancelled().await;
            state.set(ReactorState::Stopping);
            tracing::debug!("Reactor stop observed");
        });

        self.state.set(ReactorState::Stopped);
        tracing::info!("Reactor stopped");
        Ok(())
    }

    /// Drive the reactor until a handle's task returns, and take its output.
    ///
    /// The handle must already be cancelled (deregistered, or the reactor stopped),
    /// otherwise this waits for as long as the task keeps running.
    pub fn complete<T: 'static>(&self, registration: Registration<T>) -> Result<T, ReactorError> {
        let Registration { id, name, join } = registration;
        let result = self.local.block_on(&self.runtime, join);
        self.handles.borrow_mut().remove(id);

        result.map_err(|e| ReactorError::HandleFailed {
            name,
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("state", &self.state.get())
            .field("handles", &self.handle_count())
            .finish()
    }
}
