//! Lifecycle and dispatch core of a UDP query-resolution daemon.

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod net;
pub mod observability;
pub mod reactor;
pub mod worker;

pub use config::DaemonConfig;
pub use engine::{NotImplementedEngine, ResolutionEngine};
pub use error::{DaemonError, DaemonResult};
pub use lifecycle::{Daemon, Shutdown};
pub use reactor::Reactor;
pub use worker::Worker;
