//! Registered handles and the reactor's registration table.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::Shutdown;

/// Identifier of a handle registered with a [`Reactor`](super::Reactor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl HandleId {
    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

#[derive(Debug)]
struct HandleEntry {
    name: &'static str,
    token: CancellationToken,
}

/// Handles currently registered with the reactor.
///
/// Only touched from the reactor thread.
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    next_id: u64,
    entries: HashMap<HandleId, HandleEntry>,
}

impl HandleTable {
    pub(crate) fn insert(&mut self, name: &'static str, token: CancellationToken) -> HandleId {
        self.next_id += 1;
        let id = HandleId(self.next_id);
        self.entries.insert(id, HandleEntry { name, token });
        id
    }

    /// Remove `id` and cancel its token. Returns the handle name if it was present.
    pub(crate) fn remove(&mut self, id: HandleId) -> Option<&'static str> {
        let entry = self.entries.remove(&id)?;
        entry.token.cancel();
        Some(entry.name)
    }

    pub(crate) fn contains(&self, id: HandleId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Context passed to a handle's task.
///
/// The token is a child of the reactor's stop token: it is cancelled when the
/// handle is deregistered or when the reactor stops.
#[derive(Debug)]
pub struct HandleContext {
    id: HandleId,
    name: &'static str,
    token: CancellationToken,
    shutdown: Shutdown,
    table: Weak<RefCell<HandleTable>>,
}

impl HandleContext {
    pub(crate) fn new(
        id: HandleId,
        name: &'static str,
        token: CancellationToken,
        shutdown: Shutdown,
        table: Weak<RefCell<HandleTable>>,
    ) -> Self {
        Self {
            id,
            name,
            token,
            shutdown,
            table,
        }
    }

    /// This handle's ID.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// This handle's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait until the handle is deregistered or the reactor stops.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Whether the handle has been deregistered or the reactor stopped.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Ask the reactor to stop after the current dispatch cycle.
    pub fn request_stop(&self) {
        self.shutdown.trigger();
    }

    /// Remove this handle from the registration table.
    pub fn deregister(&self) {
        if let Some(table) = self.table.upgrade() {
            if table.borrow_mut().remove(self.id).is_some() {
                tracing::debug!(handle = %self.id, name = self.name, "Handle deregistered itself");
            }
        }
    }
}

/// A registered handle whose task yields `T` when it finishes.
#[derive(Debug)]
pub struct Registration<T> {
    pub(crate) id: HandleId,
    pub(crate) name: &'static str,
    pub(crate) join: JoinHandle<T>,
}

impl<T> Registration<T> {
    /// The handle's ID.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The handle's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the handle's task has returned.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
