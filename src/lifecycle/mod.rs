//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Arena → Reactor → Signal monitor → Bind listener
//!     → Worker init → Worker start
//!
//! Run:
//!     Reactor dispatches until the stop token (shutdown.rs) is cancelled
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → request stop → monitor deregisters itself
//!
//! Teardown (startup.rs):
//!     Worker stop → Listener close → Worker deinit → Arena release → exit status
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing runs until every component is in place
//! - Ordered teardown: the arena outlives every query that used it
//! - Exit status mirrors the run result

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{SignalMonitor, SignalRegistrationError};
pub use startup::{exit_code, exit_status, Daemon, DaemonReport};
