//! Top-level error taxonomy.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::signals::SignalRegistrationError;
use crate::memory::AllocationError;
use crate::net::BindError;
use crate::reactor::ReactorError;
use crate::worker::WorkerError;

/// Errors that stop the daemon from starting or from shutting down cleanly.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    SignalRegistration(#[from] SignalRegistrationError),

    #[error("reactor error: {0}")]
    Reactor(#[from] ReactorError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
