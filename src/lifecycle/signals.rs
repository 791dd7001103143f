//! OS signal handling.
//!
//! # Responsibilities
//! - Register termination handlers (SIGINT, SIGTERM; Ctrl-C on Windows)
//! - Translate the first termination request into a reactor stop
//! - Deregister after firing so the monitor fires at most once
//!
//! # Design Decisions
//! - Uses Tokio's signal streams, registered on the reactor's own driver
//! - The trigger is any future, so tests and embedders can substitute their own
//! - An untriggered monitor exits quietly when the reactor stops by other means

use std::future::Future;

use thiserror::Error;

use crate::reactor::{HandleId, Reactor, ReactorError, Registration};

/// A termination handler could not be installed.
#[derive(Debug, Error)]
#[error("failed to register {signal} handler: {source}")]
pub struct SignalRegistrationError {
    /// Signal that could not be registered.
    pub signal: &'static str,
    #[source]
    pub source: std::io::Error,
}

/// Reactor handle that turns a termination request into a reactor stop.
#[derive(Debug)]
pub struct SignalMonitor {
    registration: Registration<bool>,
}

impl SignalMonitor {
    /// Watch the process's termination signals.
    pub fn register(reactor: &Reactor) -> Result<Self, SignalRegistrationError> {
        let trigger = termination_request(reactor)?;
        Ok(Self::register_with(reactor, trigger))
    }

    /// Watch an arbitrary termination request.
    pub fn register_with<F>(reactor: &Reactor, trigger: F) -> Self
    where
        F: Future<Output = ()> + 'static,
    {
        let registration = reactor.register("signal-monitor", move |ctx| async move {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    tracing::debug!("Signal monitor cancelled before firing");
                    false
                }
                _ = trigger => {
                    tracing::info!("Termination requested, stopping reactor");
                    ctx.request_stop();
                    ctx.deregister();
                    true
                }
            }
        });

        Self { registration }
    }

    /// The monitor's handle ID.
    pub fn id(&self) -> HandleId {
        self.registration.id()
    }

    /// Detach the monitor and report whether it fired.
    pub fn finish(self, reactor: &Reactor) -> Result<bool, ReactorError> {
        reactor.deregister(self.registration.id());
        reactor.complete(self.registration)
    }
}

#[cfg(unix)]
fn termination_request(
    reactor: &Reactor,
) -> Result<impl Future<Output = ()>, SignalRegistrationError> {
    use tokio::signal::unix::{signal, SignalKind};

    let _guard = reactor.enter();
    let mut interrupt = signal(SignalKind::interrupt()).map_err(|source| {
        SignalRegistrationError {
            signal: "SIGINT",
            source,
        }
    })?;
    let mut terminate = signal(SignalKind::terminate()).map_err(|source| {
        SignalRegistrationError {
            signal: "SIGTERM",
            source,
        }
    })?;

    Ok(async move {
        let received = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        };
        tracing::info!(signal = received, "Signal received");
    })
}

#[cfg(windows)]
fn termination_request(
    reactor: &Reactor,
) -> Result<impl Future<Output = ()>, SignalRegistrationError> {
    let _guard = reactor.enter();
    let mut ctrl_c = tokio::signal::windows::ctrl_c().map_err(|source| SignalRegistrationError {
        signal: "CTRL_C",
        source,
    })?;

    Ok(async move {
        ctrl_c.recv().await;
        tracing::info!(signal = "CTRL_C", "Signal received");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::ReactorState;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[test]
    fn trigger_stops_reactor_and_deregisters() {
        let reactor = Reactor::new().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let monitor = SignalMonitor::register_with(&reactor, async move {
            let _ = rx.await;
        });
        let id = monitor.id();

        reactor.register("requester", move |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(());
        });

        reactor.run().unwrap();
        assert_eq!(reactor.state(), ReactorState::Stopped);
        assert!(!reactor.is_registered(id));
        assert!(monitor.finish(&reactor).unwrap());
    }

    #[test]
    fn untriggered_monitor_exits_quietly() {
        let reactor = Reactor::new().unwrap();
        let monitor = SignalMonitor::register_with(&reactor, std::future::pending::<()>());

        reactor.stop();
        reactor.run().unwrap();
        assert!(!monitor.finish(&reactor).unwrap());
        assert_eq!(reactor.handle_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn os_signals_register() {
        let reactor = Reactor::new().unwrap();
        let monitor = SignalMonitor::register(&reactor).unwrap();
        assert!(reactor.is_registered(monitor.id()));
        assert!(!monitor.finish(&reactor).unwrap());
    }
}
