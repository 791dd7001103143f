//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     config.listener.bind_address
//!     → listener.rs (bind, non-blocking, register with reactor)
//!     → handed to the Worker, which owns all reads and writes
//!
//! Teardown:
//!     Worker::stop() returns the socket → close()
//! ```
//!
//! # Design Decisions
//! - One socket per process; multiple listeners are future work
//! - Bind failure is fatal to startup
//! - Payloads are opaque bytes; wire format belongs to the resolution engine

pub mod listener;

pub use listener::{BindError, ListenerSocket};
