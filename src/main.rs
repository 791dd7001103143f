//! resolverd: UDP query-resolution daemon (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      RESOLVERD                        │
//!                     │                                                       │
//!   Query datagram    │  ┌──────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ──────────────────┼─▶│   net    │───▶│  worker  │───▶│     engine     │   │
//!                     │  │ listener │    │ + query  │    │  (resolution)  │   │
//!                     │  └──────────┘    └────┬─────┘    └───────┬────────┘   │
//!                     │        ▲              │ arena            │            │
//!   Response datagram │        │              ▼                  │            │
//!   ◀─────────────────┼────────┴──────── try_send_to ◀───────────┘            │
//!                     │                                                       │
//!                     │  ┌─────────────────────────────────────────────────┐  │
//!                     │  │ reactor (current-thread runtime + LocalSet)      │  │
//!                     │  │   handles: signal monitor, worker read loop      │  │
//!                     │  └─────────────────────────────────────────────────┘  │
//!                     │  ┌────────┐ ┌────────┐ ┌─────────────┐ ┌───────────┐  │
//!                     │  │ config │ │ memory │ │observability│ │ lifecycle │  │
//!                     │  └────────┘ └────────┘ └─────────────┘ └───────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```
//!
//! Binds `0.0.0.0:3535`, serves until SIGINT/SIGTERM, exits with the run result.

use std::net::SocketAddr;
use std::process::ExitCode;

use resolverd::config::DaemonConfig;
use resolverd::engine::NotImplementedEngine;
use resolverd::lifecycle::{exit_code, Daemon};
use resolverd::observability::{logging, metrics};

fn main() -> ExitCode {
    // Defaults only; this layer has no flags or environment overrides.
    let config = DaemonConfig::default();

    logging::init_logging(&config.observability);
    tracing::info!("resolverd v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        arena_limit_bytes = config.worker.arena_limit_bytes,
        max_datagram_size = config.worker.max_datagram_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let daemon = match Daemon::start(&config, NotImplementedEngine::new()) {
        Ok(daemon) => daemon,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return exit_code::<()>(&Err(e));
        }
    };

    let result = daemon.run();
    if let Err(e) = &result {
        tracing::error!(error = %e, "Daemon exited with error");
    }
    exit_code(&result)
}
