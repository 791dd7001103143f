//! Startup orchestration and ordered teardown.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build arena, reactor, signal monitor, listener and worker in dependency order
//! - Run the reactor, then tear everything down in reverse
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned before the reactor runs
//! - The listener is bound before the worker starts; traffic only when ready
//! - Teardown: worker stop → listener close → worker deinit → arena release

use std::future::Future;
use std::net::SocketAddr;
use std::process::ExitCode;

use crate::config::{validate_config, ConfigError, DaemonConfig, ValidationError};
use crate::engine::ResolutionEngine;
use crate::error::DaemonResult;
use crate::lifecycle::signals::{SignalMonitor, SignalRegistrationError};
use crate::lifecycle::Shutdown;
use crate::memory::{Arena, ArenaStats};
use crate::net::ListenerSocket;
use crate::reactor::{Reactor, ReactorState};
use crate::worker::{Worker, WorkerState, WorkerStats};

/// Summary of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct DaemonReport {
    /// Final worker counters.
    pub worker: WorkerStats,
    /// Arena counters at release.
    pub arena: ArenaStats,
    /// Whether the signal monitor triggered the stop.
    pub signalled: bool,
}

/// A fully started daemon, ready to run.
pub struct Daemon<E> {
    reactor: Reactor,
    monitor: SignalMonitor,
    worker: Worker<E>,
    local_addr: SocketAddr,
}

impl<E: ResolutionEngine + 'static> Daemon<E> {
    /// Start with the process's termination signals as the stop trigger.
    pub fn start(config: &DaemonConfig, engine: E) -> DaemonResult<Self> {
        Self::start_with_monitor(config, engine, SignalMonitor::register)
    }

    /// Start with `trigger` standing in for the termination signal.
    pub fn with_trigger<F>(config: &DaemonConfig, engine: E, trigger: F) -> DaemonResult<Self>
    where
        F: Future<Output = ()> + 'static,
    {
        Self::start_with_monitor(config, engine, move |reactor| {
            Ok(SignalMonitor::register_with(reactor, trigger))
        })
    }

    fn start_with_monitor<M>(config: &DaemonConfig, engine: E, monitor: M) -> DaemonResult<Self>
    where
        M: FnOnce(&Reactor) -> Result<SignalMonitor, SignalRegistrationError>,
    {
        validate_config(config).map_err(ConfigError::Validation)?;
        let bind_address: SocketAddr = config.listener.bind_address.parse().map_err(|_| {
            ConfigError::Validation(vec![ValidationError::BindAddress(
                config.listener.bind_address.clone(),
            )])
        })?;

        let arena = Arena::with_limit(config.worker.arena_limit_bytes);
        let reactor = Reactor::new()?;
        let monitor = monitor(&reactor)?;
        let socket = ListenerSocket::bind(&reactor, bind_address)?;
        let local_addr = socket.local_addr();

        let mut worker = Worker::init(arena, engine, &config.worker)?;
        if let Err(e) = worker.start(&reactor, socket) {
            if let Ok(arena) = worker.deinit() {
                arena.release();
            }
            return Err(e.into());
        }

        tracing::info!(
            address = %local_addr,
            arena_limit_bytes = config.worker.arena_limit_bytes,
            failure_policy = ?config.worker.failure_policy,
            "Daemon started"
        );

        Ok(Self {
            reactor,
            monitor,
            worker,
            local_addr,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop token; clones may be triggered from any thread.
    pub fn shutdown(&self) -> Shutdown {
        self.reactor.shutdown()
    }

    pub fn reactor_state(&self) -> ReactorState {
        self.reactor.state()
    }

    pub fn worker_state(&self) -> WorkerState {
        self.worker.state()
    }

    /// Run the reactor until stopped, then tear down in order.
    pub fn run(self) -> DaemonResult<DaemonReport> {
        let Daemon {
            reactor,
            monitor,
            mut worker,
            ..
        } = self;

        let run_result = reactor.run();

        let socket = worker.stop(&reactor)?;
        socket.close();
        let stats = worker.stats().unwrap_or_default();
        let arena = worker.deinit()?.release();
        let signalled = monitor.finish(&reactor)?;

        run_result?;

        tracing::info!(
            received = stats.received,
            answered = stats.answered,
            dropped = stats.dropped(),
            signalled,
            "Shutdown complete"
        );

        Ok(DaemonReport {
            worker: stats,
            arena,
            signalled,
        })
    }
}

impl<E> std::fmt::Debug for Daemon<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("local_addr", &self.local_addr)
            .field("reactor", &self.reactor)
            .field("worker", &self.worker)
            .finish()
    }
}

/// Process exit status for a run result: 0 on a clean stop, 1 otherwise.
pub fn exit_status<T>(result: &DaemonResult<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// [`exit_status`] as an [`ExitCode`].
pub fn exit_code<T>(result: &DaemonResult<T>) -> ExitCode {
    ExitCode::from(exit_status(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NotImplementedEngine;
    use crate::error::DaemonError;

    fn loopback_config() -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.worker.arena_limit_bytes = 512 * 1024;
        config
    }

    #[test]
    fn start_wires_everything_before_run() {
        let daemon = Daemon::with_trigger(
            &loopback_config(),
            NotImplementedEngine::new(),
            std::future::pending(),
        )
        .unwrap();

        assert_ne!(daemon.local_addr().port(), 0);
        assert_eq!(daemon.reactor_state(), ReactorState::Created);
        assert_eq!(daemon.worker_state(), WorkerState::Idle);
    }

    #[test]
    fn trigger_stops_cleanly() {
        let daemon = Daemon::with_trigger(
            &loopback_config(),
            NotImplementedEngine::new(),
            async {},
        )
        .unwrap();

        let result = daemon.run();
        assert_eq!(exit_status(&result), 0);

        let report = result.unwrap();
        assert!(report.signalled);
        assert_eq!(report.worker.received, 0);
    }

    #[test]
    fn invalid_config_fails_before_reactor() {
        let mut config = loopback_config();
        config.worker.max_datagram_size = 0;

        let err = Daemon::with_trigger(&config, NotImplementedEngine::new(), async {})
            .unwrap_err();
        assert!(matches!(err, DaemonError::Config(ConfigError::Validation(_))));
        assert_eq!(exit_status::<()>(&Err(err)), 1);
    }

    #[test]
    fn validated_arena_limits_always_start() {
        let datagram = 65_535;
        for limit in [datagram, datagram + 64, datagram + 4096, 96 * 1024, 2 * datagram] {
            let mut config = loopback_config();
            config.worker.max_datagram_size = datagram;
            config.worker.arena_limit_bytes = limit;

            let valid = validate_config(&config).is_ok();
            let started = Daemon::with_trigger(
                &config,
                NotImplementedEngine::new(),
                std::future::pending(),
            );
            match started {
                Ok(_) => assert!(valid, "limit {} started but failed validation", limit),
                Err(DaemonError::Config(ConfigError::Validation(_))) => {
                    assert!(!valid, "limit {} passed validation", limit)
                }
                Err(e) => panic!("limit {} passed validation but failed to start: {}", limit, e),
            }
        }
    }
}
