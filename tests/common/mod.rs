//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use resolverd::config::DaemonConfig;
use resolverd::engine::{Resolution, ResolutionEngine, ResolveError};
use resolverd::error::{DaemonError, DaemonResult};
use resolverd::lifecycle::{Daemon, DaemonReport, Shutdown};
use resolverd::worker::Query;

/// Loopback config on an ephemeral port with a small arena.
pub fn loopback_config() -> DaemonConfig {
    let mut config = DaemonConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.worker.arena_limit_bytes = 512 * 1024;
    config
}

/// Echoes payloads back; payloads starting with `!` (or empty) are malformed.
#[derive(Debug, Clone, Default)]
pub struct CountingEngine {
    pub calls: Arc<AtomicUsize>,
}

impl ResolutionEngine for CountingEngine {
    fn resolve(
        &mut self,
        query: &Query<'_>,
        answer: &mut Vec<u8>,
    ) -> Result<Resolution, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match query.payload().first() {
            None | Some(b'!') => Err(ResolveError::Malformed("rejected".into())),
            Some(_) => {
                answer.extend_from_slice(query.payload());
                Ok(Resolution::Answer)
            }
        }
    }
}

/// A daemon running on its own thread.
pub struct RunningDaemon {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: JoinHandle<DaemonResult<DaemonReport>>,
}

impl RunningDaemon {
    /// Trigger the stop token and wait for teardown.
    pub fn stop(self) -> DaemonResult<DaemonReport> {
        self.shutdown.trigger();
        self.join()
    }

    /// Wait for the daemon thread to finish.
    pub fn join(self) -> DaemonResult<DaemonReport> {
        self.handle.join().expect("daemon thread panicked")
    }
}

/// Start a daemon on a new thread; `use_signals` selects OS signals as the trigger.
pub fn spawn_daemon<E, F>(
    config: DaemonConfig,
    engine: F,
    use_signals: bool,
) -> Result<RunningDaemon, DaemonError>
where
    E: ResolutionEngine + 'static,
    F: FnOnce() -> E + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::channel();

    let handle = std::thread::spawn(move || {
        let started = if use_signals {
            Daemon::start(&config, engine())
        } else {
            Daemon::with_trigger(&config, engine(), std::future::pending())
        };

        match started {
            Ok(daemon) => {
                let _ = ready_tx.send(Ok((daemon.local_addr(), daemon.shutdown())));
                daemon.run()
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                Ok(DaemonReport {
                    worker: Default::default(),
                    arena: Default::default(),
                    signalled: false,
                })
            }
        }
    });

    match ready_rx.recv().expect("daemon thread exited early") {
        Ok((addr, shutdown)) => Ok(RunningDaemon {
            addr,
            shutdown,
            handle,
        }),
        Err(e) => {
            let _ = handle.join();
            Err(e)
        }
    }
}

/// A client socket with a short read timeout.
pub fn client() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    socket
}

/// Send `payload` and wait briefly for a reply.
pub fn exchange(client: &UdpSocket, addr: SocketAddr, payload: &[u8]) -> Option<Vec<u8>> {
    client.send_to(payload, addr).unwrap();
    let mut buf = [0u8; 2048];
    match client.recv_from(&mut buf) {
        Ok((n, _)) => Some(buf[..n].to_vec()),
        Err(_) => None,
    }
}
