//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (query counters, latency and size histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config log level)
//!     → Metrics endpoint (Prometheus scrape, only when enabled)
//! ```
//!
//! # Design Decisions
//! - Structured fields (query ID, source, outcome) on every per-query event
//! - Per-query events are trace/debug so the hot path stays quiet at info
//! - Metrics are cheap; without an installed recorder they are no-ops

pub mod logging;
pub mod metrics;
